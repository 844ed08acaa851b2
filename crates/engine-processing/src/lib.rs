pub mod chunk;
pub mod error;
pub mod partition;
pub mod transform;
