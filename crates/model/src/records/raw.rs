use serde::{Deserialize, Serialize};

/// Column order of the roaming input file.
pub const FIELD_NAMES: [&str; 5] = ["userId", "deviceId", "location", "timestamp", "status"];

/// One delimited line as read from the source, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// 1-based line number in the original file (line 1 is the header).
    pub line: u64,
    pub user_id: String,
    pub device_id: String,
    pub location: String,
    pub timestamp: String,
    pub status: String,
}

impl RawRecord {
    /// Builds a record from positional tokens. Missing trailing tokens become
    /// empty strings and extra tokens are ignored.
    pub fn from_fields<'a, I>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut it = fields.into_iter().map(|f| f.trim().to_string());
        let mut next = || it.next().unwrap_or_default();

        Self {
            line,
            user_id: next(),
            device_id: next(),
            location: next(),
            timestamp: next(),
            status: next(),
        }
    }
}
