use thiserror::Error;

/// Errors raised by chunk sinks. A sink error always means the whole chunk
/// was rejected.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error while writing chunk: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize entity: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Commit {commit} rejected: {reason}")]
    Rejected { commit: usize, reason: String },

    #[error("Sink is closed")]
    Closed,
}
