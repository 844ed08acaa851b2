use crate::error::ArchiveError;
use async_trait::async_trait;
use connectors::file::archive::FileArchiver;

pub use connectors::file::archive::ArchiveReport;

#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self) -> Result<ArchiveReport, ArchiveError>;
}

#[async_trait]
impl Archiver for FileArchiver {
    async fn archive(&self) -> Result<ArchiveReport, ArchiveError> {
        Ok(FileArchiver::archive(self).await?)
    }
}
