use crate::error::SinkError;
use async_trait::async_trait;
use connectors::sink::{JsonLinesSink, MemorySink};
use model::records::entity::RoamingStatusEntity;

/// Destination of committed chunks. Each call is one transaction: on error
/// nothing from `items` is visible.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn write_chunk(&self, items: Vec<RoamingStatusEntity>) -> Result<usize, SinkError>;
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write_chunk(&self, items: Vec<RoamingStatusEntity>) -> Result<usize, SinkError> {
        MemorySink::write_chunk(self, items).await
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn write_chunk(&self, items: Vec<RoamingStatusEntity>) -> Result<usize, SinkError> {
        JsonLinesSink::write_chunk(self, items).await
    }
}
