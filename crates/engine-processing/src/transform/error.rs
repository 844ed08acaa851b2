use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transient, // Retryable (e.g., a busy downstream lookup, timeouts)
    Permanent, // Non-retryable (e.g., malformed fields)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    // Permanent errors - skip candidates
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    // Transient errors - retry
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Transform timed out after {0:?}")]
    Timeout(Duration),
}

impl TransformError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            TransformError::Validation { .. } => ErrorType::Permanent,
            TransformError::Transient(_) => ErrorType::Transient,
            TransformError::Timeout(_) => ErrorType::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.error_type() == ErrorType::Transient
    }

    /// Short kind name recorded on failed records.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::Validation { .. } => "Validation",
            TransformError::Transient(_) => "Transient",
            TransformError::Timeout(_) => "Timeout",
        }
    }
}
