use engine_config::settings::FaultSettings;
use model::records::raw::RawRecord;
use std::time::Duration;

/// Fault to apply to a record before it is mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFault {
    /// Fail the record with a validation error.
    Reject(String),
    /// Sleep, then map the record normally.
    Delay(Duration),
    /// Fail the attempt with a retryable error.
    Transient(String),
}

/// Decides whether a record should be disturbed on its way through the
/// transformer. Production runs use [`NoFaults`].
pub trait FaultInjectionStrategy: Send + Sync {
    fn inspect(&self, record: &RawRecord) -> Option<InjectedFault>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjectionStrategy for NoFaults {
    fn inspect(&self, _record: &RawRecord) -> Option<InjectedFault> {
        None
    }
}

/// Rejects records whose device id contains `reject_pattern` and delays the
/// ones containing `delay_pattern`. Empty patterns never match.
#[derive(Debug, Clone)]
pub struct DeviceFaultInjection {
    reject_pattern: String,
    delay_pattern: String,
    delay: Duration,
}

impl DeviceFaultInjection {
    pub fn new(
        reject_pattern: impl Into<String>,
        delay_pattern: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            reject_pattern: reject_pattern.into(),
            delay_pattern: delay_pattern.into(),
            delay,
        }
    }

    pub fn from_settings(settings: &FaultSettings) -> Self {
        Self::new(
            settings.reject_pattern.clone(),
            settings.delay_pattern.clone(),
            Duration::from_millis(settings.delay_ms),
        )
    }
}

impl Default for DeviceFaultInjection {
    fn default() -> Self {
        Self::from_settings(&FaultSettings::default())
    }
}

impl FaultInjectionStrategy for DeviceFaultInjection {
    fn inspect(&self, record: &RawRecord) -> Option<InjectedFault> {
        let device = record.device_id.as_str();
        if !self.reject_pattern.is_empty() && device.contains(&self.reject_pattern) {
            return Some(InjectedFault::Reject(format!("Invalid device ID: {device}")));
        }
        if !self.delay_pattern.is_empty() && device.contains(&self.delay_pattern) {
            return Some(InjectedFault::Delay(self.delay));
        }
        None
    }
}
