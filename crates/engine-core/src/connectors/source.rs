use crate::error::SourceError;
use connectors::file::csv::reader::CsvRecordReader;
use model::records::raw::RawRecord;
use std::{path::PathBuf, sync::Arc};

/// Positioned iterator over raw records.
pub type RecordIter = Box<dyn Iterator<Item = Result<RawRecord, SourceError>> + Send>;

/// Line-addressable input. Line 1 is the header.
pub trait RecordSource: Send + Sync {
    /// Number of physical lines, header included.
    fn count_total_lines(&self) -> Result<u64, SourceError>;

    /// Records starting at `line`, in file order.
    fn open_at(&self, line: u64) -> Result<RecordIter, SourceError>;

    fn describe(&self) -> String;
}

/// CSV file source (comma delimited, flexible field count).
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    reader: CsvRecordReader,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            reader: CsvRecordReader::new(path),
        }
    }
}

impl RecordSource for CsvRecordSource {
    fn count_total_lines(&self) -> Result<u64, SourceError> {
        Ok(self.reader.count_lines()?)
    }

    fn open_at(&self, line: u64) -> Result<RecordIter, SourceError> {
        let iter = self.reader.records_from(line)?;
        Ok(Box::new(iter.map(|r| r.map_err(SourceError::from))))
    }

    fn describe(&self) -> String {
        self.reader.path().display().to_string()
    }
}

/// Source over records held in memory. `lines[0]` is the header line.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    lines: Arc<Vec<String>>,
}

impl InMemorySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Arc::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Header followed by the given data rows.
    pub fn with_header<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header = model::records::raw::FIELD_NAMES.join(",");
        Self::new(std::iter::once(header).chain(rows.into_iter().map(Into::into)))
    }
}

impl RecordSource for InMemorySource {
    fn count_total_lines(&self) -> Result<u64, SourceError> {
        Ok(self.lines.len() as u64)
    }

    fn open_at(&self, line: u64) -> Result<RecordIter, SourceError> {
        let lines = Arc::clone(&self.lines);
        let skip = line.saturating_sub(1) as usize;
        let iter = (skip..lines.len()).map(move |idx| {
            let line_no = idx as u64 + 1;
            Ok(RawRecord::from_fields(line_no, lines[idx].split(',')))
        });
        Ok(Box::new(iter))
    }

    fn describe(&self) -> String {
        format!("memory({} lines)", self.lines.len())
    }
}
