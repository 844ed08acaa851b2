use crate::records::raw::RawRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic record kept for every record that was skipped or that
/// stopped a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub step_name: String,
    pub stage: ProcessingStage,
    pub line: u64,
    pub original: Option<RawRecord>,
    pub error: FailureError,
    pub attempt_number: u32,
    pub failed_at: DateTime<Utc>,
}

/// The stage of chunk processing where the failure occurred
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Failed while reading from the source
    Read,

    /// Failed during transformation
    Transform,

    /// Failed while committing a chunk
    Write,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::Read => write!(f, "Read"),
            ProcessingStage::Transform => write!(f, "Transform"),
            ProcessingStage::Write => write!(f, "Write"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureError {
    pub error_type: String,
    pub message: String,
    pub is_retryable: bool,
}

impl FailedRecord {
    pub fn new(
        step_name: impl Into<String>,
        stage: ProcessingStage,
        line: u64,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            step_name: step_name.into(),
            stage,
            line,
            original: None,
            error: FailureError {
                error_type: error_type.into(),
                message: message.into(),
                is_retryable: false,
            },
            attempt_number: 1,
            failed_at: Utc::now(),
        }
    }

    pub fn with_original(mut self, raw: &RawRecord) -> Self {
        self.original = Some(raw.clone());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt_number = attempt;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.error.is_retryable = retryable;
        self
    }

    /// One-line description used in job summaries.
    pub fn describe(&self) -> String {
        format!(
            "{} line {} [{}] {}: {}",
            self.step_name, self.line, self.stage, self.error.error_type, self.error.message
        )
    }
}
