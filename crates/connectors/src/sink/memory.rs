use crate::error::SinkError;
use chrono::Utc;
use model::records::entity::RoamingStatusEntity;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<RoamingStatusEntity>,
    commits: usize,
    attempts: usize,
    next_id: u64,
    fail_on: HashSet<usize>,
}

/// In-memory sink. Each call to [`MemorySink::write_chunk`] is one commit:
/// either every entity in the chunk is stored or none is.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th commit attempt (1-based) fail without storing anything.
    pub async fn fail_on_commit(&self, n: usize) {
        self.state.lock().await.fail_on.insert(n);
    }

    pub async fn write_chunk(
        &self,
        chunk: Vec<RoamingStatusEntity>,
    ) -> Result<usize, SinkError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        let attempt = state.attempts;

        if state.fail_on.contains(&attempt) {
            warn!(commit = attempt, size = chunk.len(), "Rejecting chunk");
            return Err(SinkError::Rejected {
                commit: attempt,
                reason: "configured commit failure".to_string(),
            });
        }

        let now = Utc::now();
        let written = chunk.len();
        for entity in chunk {
            state.next_id += 1;
            let id = state.next_id;
            state.items.push(entity.persisted(id, now));
        }
        state.commits += 1;

        debug!(commit = attempt, written, "Chunk committed to memory");
        Ok(written)
    }

    /// Snapshot of everything committed so far.
    pub async fn items(&self) -> Vec<RoamingStatusEntity> {
        self.state.lock().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of successful commits.
    pub async fn commits(&self) -> usize {
        self.state.lock().await.commits
    }
}
