pub mod connectors;
pub mod error;
pub mod metrics;
pub mod retry;
