use engine_config::settings::error::SettingsError;
use engine_processing::error::PartitionError;
use thiserror::Error;

/// Errors raised while running jobs and partitioned steps.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Partitioning failed: {0}")]
    Partition(#[from] PartitionError),

    /// Setting error.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
