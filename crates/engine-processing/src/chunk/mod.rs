pub mod executor;
pub mod policy;

pub use executor::{ChunkExecutor, ExecutionRange, PartitionReport};
pub use policy::{ChunkPolicy, FaultTolerance};
