use crate::transform::{
    error::TransformError,
    fault::{FaultInjectionStrategy, InjectedFault, NoFaults},
};
use chrono::NaiveDateTime;
use model::records::{
    entity::{RoamingStatus, RoamingStatusEntity},
    raw::RawRecord,
};
use std::sync::Arc;
use tracing::{debug, warn};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Maps raw CSV fields to a [`RoamingStatusEntity`], consulting the fault
/// strategy first.
#[derive(Clone)]
pub struct RecordTransformer {
    faults: Arc<dyn FaultInjectionStrategy>,
}

impl RecordTransformer {
    pub fn new(faults: Arc<dyn FaultInjectionStrategy>) -> Self {
        Self { faults }
    }

    pub async fn transform(&self, raw: &RawRecord) -> Result<RoamingStatusEntity, TransformError> {
        match self.faults.inspect(raw) {
            Some(InjectedFault::Reject(reason)) => {
                warn!(line = raw.line, device_id = %raw.device_id, %reason, "Rejecting record");
                return Err(TransformError::validation("deviceId", reason));
            }
            Some(InjectedFault::Transient(reason)) => {
                debug!(line = raw.line, %reason, "Injected transient failure");
                return Err(TransformError::Transient(reason));
            }
            Some(InjectedFault::Delay(delay)) => {
                debug!(line = raw.line, delay_ms = delay.as_millis() as u64, "Delaying record");
                tokio::time::sleep(delay).await;
            }
            None => {}
        }

        map_record(raw)
    }
}

impl Default for RecordTransformer {
    fn default() -> Self {
        Self::new(Arc::new(NoFaults))
    }
}

/// Field-by-field mapping. Deterministic: equal input gives an equal entity.
pub fn map_record(raw: &RawRecord) -> Result<RoamingStatusEntity, TransformError> {
    let user_id = raw.user_id.parse::<u64>().map_err(|e| {
        TransformError::validation("userId", format!("'{}' is not a valid id ({e})", raw.user_id))
    })?;

    if raw.device_id.is_empty() {
        return Err(TransformError::validation("deviceId", "must not be empty"));
    }

    let location = if raw.location.is_empty() {
        None
    } else {
        Some(raw.location.clone())
    };

    let timestamp = parse_timestamp(&raw.timestamp)?;

    let status = raw
        .status
        .parse::<RoamingStatus>()
        .map_err(|e| TransformError::validation("status", e.to_string()))?;

    Ok(RoamingStatusEntity::new(
        user_id,
        raw.device_id.clone(),
        location,
        timestamp,
        status,
    ))
}

/// ISO local date-time, seconds and fraction optional.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TransformError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            TransformError::validation(
                "timestamp",
                format!("'{value}' is not an ISO local date-time"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::fault::DeviceFaultInjection;
    use model::records::entity::TIMESTAMP_FORMAT;
    use std::time::Duration;

    fn raw(fields: [&str; 5]) -> RawRecord {
        RawRecord::from_fields(2, fields)
    }

    #[tokio::test]
    async fn maps_every_field() {
        let transformer = RecordTransformer::default();
        let record = raw(["1001", "DEV001", "Seoul", "2024-01-15T10:30:00", "ROAMING"]);
        let entity = transformer.transform(&record).await.unwrap();

        assert_eq!(entity.user_id, 1001);
        assert_eq!(entity.device_id, "DEV001");
        assert_eq!(entity.location.as_deref(), Some("Seoul"));
        assert_eq!(entity.status, RoamingStatus::Roaming);
        assert_eq!(entity.timestamp.format(TIMESTAMP_FORMAT).to_string(), record.timestamp);
        assert_eq!(entity.id, None);
        assert_eq!(entity.created_at, None);
    }

    #[tokio::test]
    async fn same_record_gives_equal_entity() {
        let transformer = RecordTransformer::default();
        let record = raw(["7", "DEV002", "", "2024-02-01T08:00", "CONNECTED"]);
        let first = transformer.transform(&record).await.unwrap();
        let second = transformer.transform(&record).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.location, None);
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-01-15T10:30:00.250").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn invalid_fields_are_validation_errors() {
        let cases = [
            (["abc", "DEV1", "", "2024-01-01T00:00:00", "ROAMING"], "userId"),
            (["-1", "DEV1", "", "2024-01-01T00:00:00", "ROAMING"], "userId"),
            (["1", "", "", "2024-01-01T00:00:00", "ROAMING"], "deviceId"),
            (["1", "DEV1", "", "yesterday", "ROAMING"], "timestamp"),
            (["1", "DEV1", "", "2024-01-01T00:00:00", "roaming"], "status"),
        ];
        for (fields, expected) in cases {
            match map_record(&raw(fields)) {
                Err(TransformError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error on {expected}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn injected_rejection_is_permanent() {
        let transformer = RecordTransformer::new(Arc::new(DeviceFaultInjection::default()));
        let err = transformer
            .transform(&raw(["3", "DEV003", "Busan", "2024-01-01T00:00:00", "CONNECTED"]))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("DEV003"));
    }

    #[tokio::test]
    async fn injected_delay_still_maps() {
        let transformer = RecordTransformer::new(Arc::new(DeviceFaultInjection::new(
            "DEV003",
            "DEV007",
            Duration::from_millis(100),
        )));
        let started = std::time::Instant::now();
        let entity = transformer
            .transform(&raw(["7", "DEV007", "Jeju", "2024-01-01T00:00:00", "DISCONNECTED"]))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(entity.status, RoamingStatus::Disconnected);
    }
}
