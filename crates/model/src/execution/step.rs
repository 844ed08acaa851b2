use crate::execution::{stats::StepStats, status::BatchStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of one executed step: frozen stats, captured failure messages and
/// free-form details written by the step (e.g. `archived_file_count`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub name: String,
    pub stats: StepStats,
    pub failures: Vec<String>,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl StepExecution {
    pub fn new(name: impl Into<String>, stats: StepStats) -> Self {
        Self {
            name: name.into(),
            stats,
            failures: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failures.push(message.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn status(&self) -> BatchStatus {
        self.stats.status
    }
}
