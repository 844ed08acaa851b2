use crate::error::NotifyError;
use async_trait::async_trait;
use model::execution::{status::BatchStatus, summary::JobSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// When the notifier should raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOn {
    #[default]
    Failure,
    Always,
}

impl NotifyOn {
    pub fn should_notify(&self, status: BatchStatus) -> bool {
        match self {
            NotifyOn::Always => true,
            NotifyOn::Failure => status.is_unsuccessful(),
        }
    }
}

/// Consumes the final job summary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &JobSummary) -> Result<(), NotifyError>;
}

/// Alerts through the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    notify_on: NotifyOn,
}

impl LogNotifier {
    pub fn new(notify_on: NotifyOn) -> Self {
        Self { notify_on }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &JobSummary) -> Result<(), NotifyError> {
        if !self.notify_on.should_notify(summary.status) {
            return Ok(());
        }

        if summary.status.is_unsuccessful() {
            error!(
                job = %summary.job_name,
                run_id = %summary.run_id,
                status = %summary.status,
                duration_ms = summary.duration_ms as u64,
                exit = %summary.exit_description,
                "ALERT: job did not complete"
            );
        } else {
            info!(
                job = %summary.job_name,
                run_id = %summary.run_id,
                status = %summary.status,
                duration_ms = summary.duration_ms as u64,
                "Job completed"
            );
        }
        Ok(())
    }
}

/// Keeps every summary it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    received: Arc<Mutex<Vec<JobSummary>>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn received(&self) -> Vec<JobSummary> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, summary: &JobSummary) -> Result<(), NotifyError> {
        self.received.lock().await.push(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_on_failure_ignores_success() {
        assert!(!NotifyOn::Failure.should_notify(BatchStatus::Completed));
        assert!(NotifyOn::Failure.should_notify(BatchStatus::Failed));
        assert!(NotifyOn::Failure.should_notify(BatchStatus::Stopped));
        assert!(NotifyOn::Always.should_notify(BatchStatus::Completed));
    }

    #[test]
    fn notify_on_deserializes_snake_case() {
        let on: NotifyOn = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(on, NotifyOn::Always);
    }
}
