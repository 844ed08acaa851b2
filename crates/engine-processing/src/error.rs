use crate::transform::error::TransformError;
use engine_core::error::{SinkError, SourceError};
use model::execution::stats::StepStats;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("Invalid partition input: {0}")]
    InvalidInput(String),

    #[error("Failed to count source lines: {0}")]
    PartitioningIo(#[from] SourceError),
}

/// Fatal outcome of a chunk-oriented step. Every variant carries the stats
/// as they were when the step stopped.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Skip limit of {limit} exceeded at line {line}: {reason}")]
    SkipLimitExceeded {
        limit: u64,
        line: u64,
        reason: String,
        stats: StepStats,
    },

    #[error("Retry limit of {limit} exceeded at line {line} after {attempts} attempts: {reason}")]
    RetryLimitExceeded {
        limit: usize,
        line: u64,
        attempts: usize,
        reason: String,
        stats: StepStats,
    },

    #[error("Commit of chunk {sequence} failed: {source}")]
    CommitFailed {
        sequence: u64,
        #[source]
        source: SinkError,
        stats: StepStats,
    },

    #[error("Item at line {line} failed: {source}")]
    ItemFailed {
        line: u64,
        #[source]
        source: TransformError,
        stats: StepStats,
    },

    #[error("Failed to read source: {source}")]
    Read {
        #[source]
        source: SourceError,
        stats: StepStats,
    },

    /// The task running the partition panicked or was cancelled.
    #[error("Partition task aborted: {reason}")]
    Aborted { reason: String, stats: StepStats },
}

impl StepError {
    pub fn stats(&self) -> &StepStats {
        match self {
            StepError::SkipLimitExceeded { stats, .. }
            | StepError::RetryLimitExceeded { stats, .. }
            | StepError::CommitFailed { stats, .. }
            | StepError::ItemFailed { stats, .. }
            | StepError::Read { stats, .. }
            | StepError::Aborted { stats, .. } => stats,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepError::SkipLimitExceeded { .. } => "SkipLimitExceeded",
            StepError::RetryLimitExceeded { .. } => "RetryLimitExceeded",
            StepError::CommitFailed { .. } => "CommitFailed",
            StepError::ItemFailed { .. } => "ItemFailed",
            StepError::Read { .. } => "Read",
            StepError::Aborted { .. } => "Aborted",
        }
    }
}
