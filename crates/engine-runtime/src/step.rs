use crate::coordinator::PartitionCoordinator;
use async_trait::async_trait;
use chrono::Utc;
use engine_config::settings::ArchivePolicy;
use engine_core::connectors::{archive::Archiver, source::RecordSource};
use engine_processing::{
    chunk::{ChunkExecutor, ExecutionRange},
    partition::RangePartitioner,
};
use model::{
    core::identifiers::RunId,
    execution::{
        stats::StepStats, status::BatchStatus, step::StepExecution, summary::JobSummary,
    },
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What a step hands back to the job. Partitioned steps contribute the
/// manager execution followed by one execution per partition.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Completed(Vec<StepExecution>),
    Failed(Vec<StepExecution>),
}

impl StepOutcome {
    fn from_executions(executions: Vec<StepExecution>) -> Self {
        if executions
            .iter()
            .any(|e| e.status() == BatchStatus::Failed)
        {
            StepOutcome::Failed(executions)
        } else {
            StepOutcome::Completed(executions)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    pub fn executions(&self) -> &[StepExecution] {
        match self {
            StepOutcome::Completed(e) | StepOutcome::Failed(e) => e,
        }
    }

    pub fn into_executions(self) -> Vec<StepExecution> {
        match self {
            StepOutcome::Completed(e) | StepOutcome::Failed(e) => e,
        }
    }
}

/// State shared by the steps of one job run.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_name: String,
    pub run_id: RunId,
    /// Executions of the steps that already ran, in order.
    pub executions: Vec<StepExecution>,
    pub cancel: CancellationToken,
}

impl JobContext {
    pub fn new(job_name: impl Into<String>, run_id: RunId, cancel: CancellationToken) -> Self {
        Self {
            job_name: job_name.into(),
            run_id,
            executions: Vec::new(),
            cancel,
        }
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &JobContext) -> StepOutcome;
}

/// Single-threaded chunk step over the whole input.
pub struct ChunkStep {
    name: String,
    executor: ChunkExecutor,
}

impl ChunkStep {
    pub fn new(name: impl Into<String>, executor: ChunkExecutor) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }
}

#[async_trait]
impl Step for ChunkStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &JobContext) -> StepOutcome {
        let report = self.executor.execute(ExecutionRange::whole(&self.name)).await;
        StepOutcome::from_executions(vec![report.to_step_execution()])
    }
}

/// Partitions the input and runs every partition through the coordinator.
pub struct PartitionedStep {
    name: String,
    source: Arc<dyn RecordSource>,
    coordinator: PartitionCoordinator,
    grid_size: usize,
}

impl PartitionedStep {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn RecordSource>,
        coordinator: PartitionCoordinator,
        grid_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            coordinator,
            grid_size,
        }
    }

    fn manager_failure(&self, message: String) -> StepOutcome {
        error!(step = %self.name, error = %message, "Partitioned step failed");
        let stats = StepStats::started().freeze(BatchStatus::Failed);
        StepOutcome::Failed(vec![
            StepExecution::new(self.name.clone(), stats).with_failure(message),
        ])
    }
}

#[async_trait]
impl Step for PartitionedStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &JobContext) -> StepOutcome {
        let Ok(grid_size) = i64::try_from(self.grid_size) else {
            return self.manager_failure(format!(
                "{}: grid size {} is out of range",
                self.name, self.grid_size
            ));
        };
        let descriptors = match RangePartitioner::partition_source(self.source.as_ref(), grid_size)
        {
            Ok(descriptors) => descriptors,
            Err(e) => return self.manager_failure(format!("{}: {}", self.name, e)),
        };
        let partition_count = descriptors.len();

        let outcome = match self.coordinator.run(descriptors).await {
            Ok(outcome) => outcome,
            Err(e) => return self.manager_failure(format!("{}: {}", self.name, e)),
        };

        let mut manager = StepExecution::new(self.name.clone(), outcome.stats.as_step_stats())
            .with_detail("partitions", partition_count as u64)
            .with_detail("source", self.source.describe());
        let failed = outcome.failed_partitions().count();
        if failed > 0 {
            manager = manager.with_failure(format!(
                "{}: {failed} of {partition_count} partitions failed",
                self.name
            ));
        }

        let mut executions = vec![manager];
        executions.extend(outcome.partitions.iter().map(|p| p.to_step_execution()));
        StepOutcome::from_executions(executions)
    }
}

/// Copies the input files into the backup directory before processing.
pub struct ArchiveStep {
    name: String,
    archiver: Arc<dyn Archiver>,
    policy: ArchivePolicy,
}

impl ArchiveStep {
    pub fn new(name: impl Into<String>, archiver: Arc<dyn Archiver>, policy: ArchivePolicy) -> Self {
        Self {
            name: name.into(),
            archiver,
            policy,
        }
    }
}

#[async_trait]
impl Step for ArchiveStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &JobContext) -> StepOutcome {
        let stats = StepStats::started();
        match self.archiver.archive().await {
            Ok(report) => {
                info!(
                    step = %self.name,
                    archived = report.archived_count(),
                    destination = %report.destination.display(),
                    "Archive step completed"
                );
                let mut execution =
                    StepExecution::new(self.name.clone(), stats.freeze(BatchStatus::Completed))
                        .with_detail("archived_file_count", report.archived_count() as u64)
                        .with_detail("destination", report.destination.display().to_string());
                if !report.failed.is_empty() {
                    execution = execution.with_detail("failed_file_count", report.failed.len() as u64);
                }
                StepOutcome::Completed(vec![execution])
            }
            Err(e) => match self.policy {
                ArchivePolicy::BestEffort => {
                    warn!(step = %self.name, error = %e, "Archive failed, continuing without backup");
                    let execution =
                        StepExecution::new(self.name.clone(), stats.freeze(BatchStatus::Completed))
                            .with_detail("archived_file_count", 0u64)
                            .with_detail("archive_error", e.to_string());
                    StepOutcome::Completed(vec![execution])
                }
                ArchivePolicy::FailFast => {
                    error!(step = %self.name, error = %e, "Archive failed");
                    let execution =
                        StepExecution::new(self.name.clone(), stats.freeze(BatchStatus::Failed))
                            .with_detail("archived_file_count", 0u64)
                            .with_failure(format!("{}: {}", self.name, e));
                    StepOutcome::Failed(vec![execution])
                }
            },
        }
    }
}

/// Builds and logs an interim summary of the steps that ran before it.
pub struct SummaryStep {
    name: String,
}

impl SummaryStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step for SummaryStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &JobContext) -> StepOutcome {
        let stats = StepStats::started();
        let status = if ctx
            .executions
            .iter()
            .any(|e| e.status().is_unsuccessful())
        {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        };
        let start = ctx
            .executions
            .iter()
            .map(|e| e.stats.start_time)
            .min()
            .unwrap_or(stats.start_time);

        let summary = JobSummary::build(
            ctx.job_name.clone(),
            ctx.run_id.as_str(),
            status,
            start,
            Utc::now(),
            &ctx.executions,
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
                "Interim step summary"
            );
        }
        info!(
            job = %summary.job_name,
            steps = summary.steps.len(),
            exceptions = summary.exceptions.len(),
            "Interim job summary"
        );

        let execution = StepExecution::new(self.name.clone(), stats.freeze(BatchStatus::Completed))
            .with_detail("steps_summarized", summary.steps.len() as u64);
        StepOutcome::Completed(vec![execution])
    }
}
