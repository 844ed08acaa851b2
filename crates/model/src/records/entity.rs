use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Canonical textual form of entity timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoamingStatus {
    Connected,
    Disconnected,
    Roaming,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown roaming status: '{0}'")]
pub struct UnknownStatus(pub String);

impl RoamingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoamingStatus::Connected => "CONNECTED",
            RoamingStatus::Disconnected => "DISCONNECTED",
            RoamingStatus::Roaming => "ROAMING",
        }
    }
}

impl FromStr for RoamingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECTED" => Ok(RoamingStatus::Connected),
            "DISCONNECTED" => Ok(RoamingStatus::Disconnected),
            "ROAMING" => Ok(RoamingStatus::Roaming),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RoamingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, typed roaming status ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamingStatusEntity {
    /// Assigned by the sink on write.
    pub id: Option<u64>,
    pub user_id: u64,
    pub device_id: String,
    pub location: Option<String>,
    pub timestamp: NaiveDateTime,
    pub status: RoamingStatus,
    /// Stamped by the sink at write time.
    pub created_at: Option<DateTime<Utc>>,
}

impl RoamingStatusEntity {
    pub fn new(
        user_id: u64,
        device_id: impl Into<String>,
        location: Option<String>,
        timestamp: NaiveDateTime,
        status: RoamingStatus,
    ) -> Self {
        Self {
            id: None,
            user_id,
            device_id: device_id.into(),
            location,
            timestamp,
            status,
            created_at: None,
        }
    }

    /// Timestamp rendered with [`TIMESTAMP_FORMAT`].
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Marks the entity as persisted.
    pub fn persisted(mut self, id: u64, at: DateTime<Utc>) -> Self {
        self.id = Some(id);
        self.created_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn status_parses_only_exact_names() {
        assert_eq!("ROAMING".parse(), Ok(RoamingStatus::Roaming));
        assert_eq!(
            "roaming".parse::<RoamingStatus>(),
            Err(UnknownStatus("roaming".into()))
        );
    }

    #[test]
    fn status_serializes_as_upper_case() {
        let json = serde_json::to_string(&RoamingStatus::Disconnected).unwrap();
        assert_eq!(json, "\"DISCONNECTED\"");
    }

    #[test]
    fn persisted_sets_id_and_created_at() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let entity = RoamingStatusEntity::new(1, "DEV001", None, ts, RoamingStatus::Connected);
        assert_eq!(entity.formatted_timestamp(), "2024-01-15T10:30:00");

        let now = Utc::now();
        let stored = entity.persisted(42, now);
        assert_eq!(stored.id, Some(42));
        assert_eq!(stored.created_at, Some(now));
    }
}
