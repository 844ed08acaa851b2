use serde::{Deserialize, Serialize};

/// A contiguous, inclusive range of data lines assigned to one worker.
///
/// Line numbers follow the original file numbering: line 1 is the header, so
/// the first data line is 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub index: usize,
    pub start_line: u64,
    pub end_line: u64,
}

impl PartitionDescriptor {
    pub fn new(index: usize, start_line: u64, end_line: u64) -> Self {
        Self {
            index,
            start_line,
            end_line,
        }
    }

    /// Number of records covered by this partition.
    pub fn len(&self) -> u64 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_line < self.start_line
    }

    pub fn name(&self) -> String {
        format!("partition{}", self.index)
    }

    pub fn contains(&self, line: u64) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}
