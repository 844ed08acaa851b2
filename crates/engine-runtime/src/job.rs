use crate::{
    coordinator::{PartitionCoordinator, PoolConfig},
    step::{ArchiveStep, ChunkStep, JobContext, PartitionedStep, Step, SummaryStep},
};
use chrono::Utc;
use engine_config::settings::BatchSettings;
use engine_core::connectors::{
    archive::Archiver, notify::Notifier, sink::RecordSink, source::RecordSource,
};
use engine_processing::{
    chunk::{ChunkExecutor, ChunkPolicy},
    transform::{NoFaults, RecordTransformer, fault::FaultInjectionStrategy},
};
use model::{
    core::identifiers::RunId,
    execution::{status::BatchStatus, step::StepExecution, summary::JobSummary},
};
use std::{fmt, str::FromStr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const CHUNK_STEP: &str = "chunkReadAndSaveStep";
pub const ROBUST_STEP: &str = "robustReadAndSaveStep";
pub const PARTITIONED_STEP: &str = "partitionedStep";
pub const ARCHIVE_STEP: &str = "fileArchiveStep";
pub const SUMMARY_STEP: &str = "completionNotificationStep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Plain chunk processing, first failure is fatal.
    ChunkSync,
    /// Chunk processing with skip and retry.
    RobustSync,
    PartitionedSync,
    /// Archive, then partitioned processing, then summary.
    FullSync,
}

impl JobKind {
    pub fn job_name(&self) -> &'static str {
        match self {
            JobKind::ChunkSync => "chunkSyncJob",
            JobKind::RobustSync => "robustSyncJob",
            JobKind::PartitionedSync => "partitioningSyncJob",
            JobKind::FullSync => "fullSyncJob",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.job_name())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chunk" | "chunksyncjob" => Ok(JobKind::ChunkSync),
            "robust" | "robustsyncjob" => Ok(JobKind::RobustSync),
            "partitioned" | "partitioningsyncjob" => Ok(JobKind::PartitionedSync),
            "full" | "fullsyncjob" => Ok(JobKind::FullSync),
            other => Err(format!("unknown job '{other}'")),
        }
    }
}

/// Collaborators a job is wired with.
#[derive(Clone)]
pub struct JobResources {
    pub source: Arc<dyn RecordSource>,
    pub sink: Arc<dyn RecordSink>,
    pub archiver: Arc<dyn Archiver>,
    pub notifier: Arc<dyn Notifier>,
    /// Applied by fault-tolerant steps only.
    pub faults: Arc<dyn FaultInjectionStrategy>,
}

/// Final state of a job run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub summary: JobSummary,
    pub executions: Vec<StepExecution>,
}

impl JobReport {
    pub fn status(&self) -> BatchStatus {
        self.summary.status
    }
}

/// Runs steps in order. A failed step halts the chain; cancellation is
/// honoured between steps.
pub struct JobOrchestrator {
    job_name: String,
    steps: Vec<Box<dyn Step>>,
    notifier: Arc<dyn Notifier>,
}

impl JobOrchestrator {
    pub fn new(job_name: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            job_name: job_name.into(),
            steps: Vec::new(),
            notifier,
        }
    }

    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Assembles the steps of `kind` from settings and collaborators.
    pub fn build(kind: JobKind, settings: &BatchSettings, resources: JobResources) -> Self {
        let job = Self::new(kind.job_name(), Arc::clone(&resources.notifier));

        let fault_tolerant = |resources: &JobResources| {
            ChunkExecutor::new(
                Arc::clone(&resources.source),
                Arc::clone(&resources.sink),
                RecordTransformer::new(Arc::clone(&resources.faults)),
                ChunkPolicy::from_settings(settings, true),
            )
        };
        let partitioned = |resources: &JobResources| {
            PartitionedStep::new(
                PARTITIONED_STEP,
                Arc::clone(&resources.source),
                PartitionCoordinator::new(fault_tolerant(resources), PoolConfig::from(&settings.pool)),
                settings.grid_size,
            )
        };

        match kind {
            JobKind::ChunkSync => job.with_step(ChunkStep::new(
                CHUNK_STEP,
                ChunkExecutor::new(
                    Arc::clone(&resources.source),
                    Arc::clone(&resources.sink),
                    RecordTransformer::new(Arc::new(NoFaults)),
                    ChunkPolicy::from_settings(settings, false),
                ),
            )),
            JobKind::RobustSync => {
                job.with_step(ChunkStep::new(ROBUST_STEP, fault_tolerant(&resources)))
            }
            JobKind::PartitionedSync => job.with_step(partitioned(&resources)),
            JobKind::FullSync => job
                .with_step(ArchiveStep::new(
                    ARCHIVE_STEP,
                    Arc::clone(&resources.archiver),
                    settings.archive.policy,
                ))
                .with_step(partitioned(&resources))
                .with_step(SummaryStep::new(SUMMARY_STEP)),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, cancel: CancellationToken) -> JobReport {
        let run_id = RunId::generate();
        let mut status = BatchStatus::Pending;
        let mut ctx = JobContext::new(self.job_name.clone(), run_id.clone(), cancel);

        // Before hook
        let start_time = Utc::now();
        transition(&mut status, BatchStatus::Running);
        info!(
            job = %self.job_name,
            run_id = %run_id,
            steps = self.steps.len(),
            start = %start_time,
            "Job started"
        );

        let mut final_status = BatchStatus::Completed;
        for step in &self.steps {
            if ctx.cancel.is_cancelled() {
                warn!(job = %self.job_name, next_step = step.name(), "Cancellation requested, stopping job");
                final_status = BatchStatus::Stopped;
                break;
            }

            info!(job = %self.job_name, step = step.name(), "Executing step");
            let outcome = step.execute(&ctx).await;
            let failed = outcome.is_failed();
            ctx.executions.extend(outcome.into_executions());

            if failed {
                error!(job = %self.job_name, step = step.name(), "Step failed, halting job");
                final_status = BatchStatus::Failed;
                break;
            }
        }
        transition(&mut status, final_status);

        // After hook
        let end_time = Utc::now();
        let summary = JobSummary::build(
            self.job_name.clone(),
            run_id.as_str(),
            status,
            start_time,
            end_time,
            &ctx.executions,
        );
        log_summary(&summary);

        if let Err(e) = self.notifier.notify(&summary).await {
            warn!(job = %self.job_name, error = %e, "Failed to deliver job notification");
        }

        JobReport {
            summary,
            executions: ctx.executions,
        }
    }
}

fn transition(current: &mut BatchStatus, next: BatchStatus) {
    if current.can_transition_to(next) {
        *current = next;
    } else {
        warn!(from = %current, to = %next, "Ignoring invalid job status transition");
    }
}

fn log_summary(summary: &JobSummary) {
    info!(
        job = %summary.job_name,
        run_id = %summary.run_id,
        status = %summary.status,
        start = %summary.start_time,
        end = %summary.end_time,
        duration_ms = summary.duration_ms as u64,
        "Job finished"
    );
    for step in &summary.steps {
        info!(
            step = %step.name,
            status = %step.status,
            read = step.read_count,
            written = step.write_count,
            skipped = step.skip_count,
            retried = step.retry_count,
            commits = step.commit_count,
            rollbacks = step.rollback_count,
            duration_ms = step.duration_ms as u64,
            "Step summary"
        );
    }
    for exception in &summary.exceptions {
        warn!(job = %summary.job_name, %exception, "Captured exception");
    }
    if !summary.exit_description.is_empty() {
        info!(job = %summary.job_name, exit = %summary.exit_description, "Exit description");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_parses_cli_names() {
        assert_eq!("chunk".parse::<JobKind>().unwrap(), JobKind::ChunkSync);
        assert_eq!("Robust".parse::<JobKind>().unwrap(), JobKind::RobustSync);
        assert_eq!("partitioned".parse::<JobKind>().unwrap(), JobKind::PartitionedSync);
        assert_eq!("fullSyncJob".parse::<JobKind>().unwrap(), JobKind::FullSync);
        assert!("nightly".parse::<JobKind>().is_err());
    }
}
