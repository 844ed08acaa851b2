use crate::file::csv::error::FileError;
use csv::{ByteRecordsIntoIter, ReaderBuilder, Trim};
use model::records::raw::RawRecord;
use std::{
    borrow::Cow,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Reads delimited roaming records from a file on disk.
///
/// The reader never keeps the file open between calls, so one instance can be
/// shared by any number of partitions, each opening its own cursor.
#[derive(Debug, Clone)]
pub struct CsvRecordReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvRecordReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counts physical lines, header included, in one sequential scan.
    pub fn count_lines(&self) -> Result<u64, FileError> {
        let file = File::open(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::with_capacity(256);
        let mut count = 0u64;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            count += 1;
        }

        debug!(path = %self.path.display(), lines = count, "Counted lines");
        Ok(count)
    }

    /// Opens a cursor whose first record is the one starting at `line`
    /// (1-based, header is line 1). Every earlier line is skipped, including
    /// lines the parser rejects. Fields are decoded lossily, so invalid UTF-8
    /// reaches the transformer instead of failing the read.
    pub fn records_from(&self, line: u64) -> Result<CsvRecordIter, FileError> {
        let file = File::open(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .from_reader(file);

        Ok(CsvRecordIter {
            inner: reader.into_byte_records(),
            start_line: line.max(1),
            fallback_line: 0,
        })
    }
}

pub struct CsvRecordIter {
    inner: ByteRecordsIntoIter<File>,
    start_line: u64,
    fallback_line: u64,
}

impl Iterator for CsvRecordIter {
    type Item = Result<RawRecord, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                Err(e) => {
                    let line = e
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(self.fallback_line + 1);
                    self.fallback_line = line;
                    if line < self.start_line {
                        debug!(line, error = %e, "Ignoring unreadable line before cursor start");
                        continue;
                    }
                    return Some(Err(FileError::ReadError {
                        line,
                        message: e.to_string(),
                    }));
                }
            };

            self.fallback_line += 1;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(self.fallback_line);

            if line < self.start_line {
                continue;
            }

            let fields: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();
            return Some(Ok(RawRecord::from_fields(
                line,
                fields.iter().map(|f| f.as_ref()),
            )));
        }
    }
}
