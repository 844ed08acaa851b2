use connectors::file::csv::error::FileError;
use thiserror::Error;

pub use connectors::error::SinkError;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Failed to read source: {0}")]
    Io(String),

    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl From<FileError> for SourceError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(path) => SourceError::NotFound(path),
            FileError::ReadError { line, message } => SourceError::Malformed { line, message },
            other => SourceError::Io(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive source directory not found: {0}")]
    SourceMissing(String),

    #[error("Archive failed: {0}")]
    Io(String),
}

impl From<FileError> for ArchiveError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(path) => ArchiveError::SourceMissing(path),
            other => ArchiveError::Io(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}
