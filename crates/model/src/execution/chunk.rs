use serde::{Deserialize, Serialize};

/// A record dropped from a chunk by the skip policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub line: u64,
    pub reason: String,
    pub attempts: u32,
}

/// A record that needed more than one attempt before it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetriedItem {
    pub line: u64,
    pub attempts: u32,
}

/// What happened to one committed chunk. Built once at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// 0-based chunk number within the partition.
    pub sequence: u64,
    pub attempted: u64,
    pub written: u64,
    pub skipped: Vec<SkippedItem>,
    pub retried: Vec<RetriedItem>,
}

impl ChunkOutcome {
    pub fn skip_count(&self) -> u64 {
        self.skipped.len() as u64
    }

    /// Extra attempts spent inside this chunk.
    pub fn retry_count(&self) -> u64 {
        self.retried
            .iter()
            .map(|r| u64::from(r.attempts.saturating_sub(1)))
            .sum()
    }
}
