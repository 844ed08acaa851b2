use crate::execution::{step::StepExecution, status::BatchStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-step line of the job summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub name: String,
    pub status: BatchStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub skip_count: u64,
    pub retry_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    pub duration_ms: u128,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl From<&StepExecution> for StepSummary {
    fn from(step: &StepExecution) -> Self {
        let c = step.stats.counters;
        Self {
            name: step.name.clone(),
            status: step.stats.status,
            read_count: c.read_count,
            write_count: c.write_count,
            skip_count: c.skip_count,
            retry_count: c.retry_count,
            commit_count: c.commit_count,
            rollback_count: c.rollback_count,
            duration_ms: step.stats.duration().as_millis(),
            details: step.details.clone(),
        }
    }
}

/// Structured outcome of a whole job run, handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_name: String,
    pub run_id: String,
    pub status: BatchStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u128,
    pub steps: Vec<StepSummary>,
    pub exceptions: Vec<String>,
    pub exit_description: String,
}

impl JobSummary {
    pub fn build(
        job_name: impl Into<String>,
        run_id: impl Into<String>,
        status: BatchStatus,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        steps: &[StepExecution],
    ) -> Self {
        let exceptions: Vec<String> = steps
            .iter()
            .flat_map(|s| s.failures.iter().cloned())
            .collect();
        let exit_description = match status {
            BatchStatus::Completed => String::new(),
            _ => exceptions.first().cloned().unwrap_or_default(),
        };

        Self {
            job_name: job_name.into(),
            run_id: run_id.into(),
            status,
            start_time,
            end_time,
            duration_ms: (end_time - start_time)
                .to_std()
                .unwrap_or_default()
                .as_millis(),
            steps: steps.iter().map(StepSummary::from).collect(),
            exceptions,
            exit_description,
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepSummary> {
        self.steps.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::stats::StepStats;

    #[test]
    fn collects_failures_and_exit_description() {
        let ok = StepExecution::new("archive", StepStats::started().freeze(BatchStatus::Completed))
            .with_detail("archived_file_count", 1);
        let failed = StepExecution::new(
            "process",
            StepStats::started().freeze(BatchStatus::Failed),
        )
        .with_failure("Skip limit of 5 exceeded");

        let start = ok.stats.start_time;
        let summary = JobSummary::build(
            "fullSync",
            "run-1",
            BatchStatus::Failed,
            start,
            Utc::now(),
            &[ok, failed],
        );

        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.exceptions, vec!["Skip limit of 5 exceeded"]);
        assert_eq!(summary.exit_description, "Skip limit of 5 exceeded");
        assert_eq!(
            summary.step("archive").unwrap().details["archived_file_count"],
            serde_json::json!(1)
        );
    }
}
