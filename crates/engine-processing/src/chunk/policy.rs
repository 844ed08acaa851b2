use engine_config::settings::{BatchSettings, RetryExhaustedAction};
use engine_core::retry::RetryPolicy;
use std::time::Duration;

/// Skip and retry rules of a fault-tolerant step.
#[derive(Debug, Clone)]
pub struct FaultTolerance {
    pub skip_limit: u64,
    pub retry: RetryPolicy,
    pub retry_exhausted: RetryExhaustedAction,
    /// Per-attempt limit; a slower transform counts as a transient failure.
    pub transform_timeout: Option<Duration>,
}

impl FaultTolerance {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            skip_limit: settings.skip_limit,
            retry: RetryPolicy::from_retry_limit(settings.retry_limit, settings.retry_backoff()),
            retry_exhausted: settings.retry_exhausted,
            transform_timeout: settings.transform_timeout(),
        }
    }
}

impl Default for FaultTolerance {
    fn default() -> Self {
        Self::from_settings(&BatchSettings::default())
    }
}

/// How a chunk executor groups and commits records. Without fault tolerance
/// the first failing record stops the step.
#[derive(Debug, Clone)]
pub struct ChunkPolicy {
    pub chunk_size: usize,
    pub fault_tolerance: Option<FaultTolerance>,
}

impl ChunkPolicy {
    pub fn plain(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            fault_tolerance: None,
        }
    }

    pub fn fault_tolerant(chunk_size: usize, tolerance: FaultTolerance) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            fault_tolerance: Some(tolerance),
        }
    }

    pub fn from_settings(settings: &BatchSettings, fault_tolerant: bool) -> Self {
        if fault_tolerant {
            Self::fault_tolerant(settings.chunk_size, FaultTolerance::from_settings(settings))
        } else {
            Self::plain(settings.chunk_size)
        }
    }

    pub fn is_fault_tolerant(&self) -> bool {
        self.fault_tolerance.is_some()
    }
}
