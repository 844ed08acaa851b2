use crate::execution::status::BatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{ops::AddAssign, time::Duration};

/// Monotonic counters tracked for every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub read_count: u64,
    pub write_count: u64,
    pub skip_count: u64,
    pub retry_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Self) {
        self.read_count += rhs.read_count;
        self.write_count += rhs.write_count;
        self.skip_count += rhs.skip_count;
        self.retry_count += rhs.retry_count;
        self.commit_count += rhs.commit_count;
        self.rollback_count += rhs.rollback_count;
    }
}

/// Statistics of a single step (or a single partition of a step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    #[serde(flatten)]
    pub counters: Counters,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: BatchStatus,
}

impl StepStats {
    /// Stats for a step that starts running now.
    pub fn started() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(start_time: DateTime<Utc>) -> Self {
        Self {
            counters: Counters::default(),
            start_time,
            end_time: None,
            status: BatchStatus::Running,
        }
    }

    /// Freezes the stats with a terminal status. Freezing twice keeps the
    /// first end time and status.
    pub fn freeze(mut self, status: BatchStatus) -> Self {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
            self.status = status;
        }
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.end_time
            .map(|end| (end - self.start_time).to_std().unwrap_or_default())
            .unwrap_or_default()
    }
}

/// Statistics aggregated over every step or partition of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(flatten)]
    pub counters: Counters,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    pub step_count: usize,
    pub failed_steps: usize,
}

impl JobStats {
    /// Sums counters, takes the earliest start and latest end. The result
    /// does not depend on the iteration order.
    pub fn aggregate<'a, I>(steps: I) -> Self
    where
        I: IntoIterator<Item = &'a StepStats>,
    {
        let mut stats = JobStats {
            counters: Counters::default(),
            start_time: None,
            end_time: None,
            status: BatchStatus::Completed,
            step_count: 0,
            failed_steps: 0,
        };

        for step in steps {
            stats.counters += step.counters;
            stats.step_count += 1;
            stats.start_time = Some(match stats.start_time {
                Some(current) => current.min(step.start_time),
                None => step.start_time,
            });
            stats.end_time = match (stats.end_time, step.end_time) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            if step.status == BatchStatus::Failed {
                stats.failed_steps += 1;
            }
        }

        if stats.failed_steps > 0 {
            stats.status = BatchStatus::Failed;
        }
        stats
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    /// Collapses the aggregate back into step-level stats, e.g. for the
    /// manager step of a partitioned run.
    pub fn as_step_stats(&self) -> StepStats {
        let start = self.start_time.unwrap_or_else(Utc::now);
        StepStats {
            counters: self.counters,
            start_time: start,
            end_time: Some(self.end_time.unwrap_or(start)),
            status: self.status,
        }
    }
}
