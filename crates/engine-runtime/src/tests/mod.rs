mod coordinator;

use async_trait::async_trait;
use connectors::sink::MemorySink;
use engine_core::{
    connectors::{
        archive::{ArchiveReport, Archiver},
        sink::RecordSink,
        source::InMemorySource,
    },
    error::{ArchiveError, SinkError},
};
use model::records::entity::RoamingStatusEntity;
use std::{path::PathBuf, time::Duration};

pub(crate) fn row(user: u64, device: &str, status: &str) -> String {
    format!("{user},{device},Seoul,2024-01-01T10:00:00,{status}")
}

/// `count` valid rows with devices DEV000..DEV009 repeating.
pub(crate) fn source_with_rows(count: u64) -> InMemorySource {
    InMemorySource::with_header((1..=count).map(|u| row(u, &format!("DEV{:03}", u % 10), "CONNECTED")))
}

/// Delays each commit so that chunks with low user ids finish last.
pub(crate) struct ReverseOrderSink {
    pub inner: MemorySink,
}

#[async_trait]
impl RecordSink for ReverseOrderSink {
    async fn write_chunk(&self, items: Vec<RoamingStatusEntity>) -> Result<usize, SinkError> {
        let first = items.first().map(|e| e.user_id).unwrap_or(0);
        let delay = 100u64.saturating_sub(first * 2);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.write_chunk(items).await
    }
}

/// Panics on the chunk that starts with `panic_on_user`; every other chunk
/// is committed to `inner` after `delay`.
pub(crate) struct PanickingSink {
    pub inner: MemorySink,
    pub panic_on_user: u64,
    pub delay: Duration,
}

#[async_trait]
impl RecordSink for PanickingSink {
    async fn write_chunk(&self, items: Vec<RoamingStatusEntity>) -> Result<usize, SinkError> {
        if items.first().is_some_and(|e| e.user_id == self.panic_on_user) {
            panic!("sink exploded");
        }
        tokio::time::sleep(self.delay).await;
        self.inner.write_chunk(items).await
    }
}

pub(crate) struct StaticArchiver {
    pub fail: bool,
}

#[async_trait]
impl Archiver for StaticArchiver {
    async fn archive(&self) -> Result<ArchiveReport, ArchiveError> {
        if self.fail {
            Err(ArchiveError::SourceMissing("data".into()))
        } else {
            Ok(ArchiveReport {
                destination: PathBuf::from("backup/archive_20240101_000000"),
                archived: vec![PathBuf::from("data/roaming.csv")],
                failed: Vec::new(),
            })
        }
    }
}
