pub mod chunk;
pub mod failed_row;
pub mod partition;
pub mod stats;
pub mod status;
pub mod step;
pub mod summary;
