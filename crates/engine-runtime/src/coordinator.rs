use crate::error::RuntimeError;
use engine_config::settings::PoolSettings;
use engine_processing::chunk::{ChunkExecutor, ExecutionRange, PartitionReport};
use model::execution::{partition::PartitionDescriptor, stats::JobStats, status::BatchStatus};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
}

impl PoolConfig {
    /// Starts at `core_size` workers and adds one worker per partition that
    /// does not fit in the queue, up to `max_size`. Never more workers than
    /// partitions.
    pub fn workers_for(&self, pending: usize) -> usize {
        let core = self.core_size.max(1);
        let overflow = pending.saturating_sub(core + self.queue_capacity);
        let workers = (core + overflow).min(self.max_size.max(core));
        workers.min(pending.max(1))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&PoolSettings::default())
    }
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        Self {
            core_size: settings.core_size,
            max_size: settings.max_size,
            queue_capacity: settings.queue_capacity,
        }
    }
}

/// All partitions of a run, sorted by index, with their aggregate.
#[derive(Debug)]
pub struct PartitionedOutcome {
    pub stats: JobStats,
    pub partitions: Vec<PartitionReport>,
}

impl PartitionedOutcome {
    pub fn is_success(&self) -> bool {
        self.stats.status == BatchStatus::Completed
    }

    pub fn failed_partitions(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| !p.is_success())
    }
}

/// Runs partitions on a bounded pool of tokio tasks. A failed partition does
/// not cancel its siblings; a panicking partition is reported as failed and
/// its worker moves on to the next one.
#[derive(Clone)]
pub struct PartitionCoordinator {
    executor: ChunkExecutor,
    pool: PoolConfig,
}

impl PartitionCoordinator {
    pub fn new(executor: ChunkExecutor, pool: PoolConfig) -> Self {
        Self { executor, pool }
    }

    pub async fn run(
        &self,
        descriptors: Vec<PartitionDescriptor>,
    ) -> Result<PartitionedOutcome, RuntimeError> {
        let total = descriptors.len();
        if total == 0 {
            info!("No partitions to run");
            return Ok(Self::aggregate(Vec::new()));
        }

        let workers = self.pool.workers_for(total);
        info!(
            partitions = total,
            workers,
            queue_capacity = self.pool.queue_capacity,
            "Launching partition workers"
        );

        let (tx, rx) = mpsc::channel::<PartitionDescriptor>(self.pool.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx = Arc::clone(&rx);
            let executor = self.executor.clone();
            handles.push(tokio::spawn(async move {
                let mut reports = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(descriptor) = next else {
                        break;
                    };
                    debug!(worker, partition = %descriptor.name(), "Worker picked up partition");
                    let task_executor = executor.clone();
                    let task = tokio::spawn(async move {
                        task_executor.execute_partition(&descriptor).await
                    });
                    let report = match task.await {
                        Ok(report) => report,
                        Err(e) => {
                            error!(
                                worker,
                                partition = %descriptor.name(),
                                error = %e,
                                "Partition task aborted"
                            );
                            PartitionReport::aborted(
                                ExecutionRange::from(&descriptor),
                                e.to_string(),
                            )
                        }
                    };
                    reports.push(report);
                }
                reports
            }));
        }

        // Blocks while the queue is full.
        for descriptor in descriptors {
            if tx.send(descriptor).await.is_err() {
                error!("All partition workers stopped before the queue was drained");
                break;
            }
        }
        drop(tx);

        // Every worker is awaited before any error is returned.
        let mut partitions = Vec::with_capacity(total);
        let mut join_error = None;
        for handle in handles {
            match handle.await {
                Ok(reports) => partitions.extend(reports),
                Err(e) => {
                    warn!(error = %e, "Partition worker did not finish");
                    join_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = join_error {
            return Err(RuntimeError::TaskJoin(e));
        }

        let outcome = Self::aggregate(partitions);
        info!(
            partitions = outcome.partitions.len(),
            failed = outcome.stats.failed_steps,
            read = outcome.stats.counters.read_count,
            written = outcome.stats.counters.write_count,
            skipped = outcome.stats.counters.skip_count,
            status = %outcome.stats.status,
            "All partitions finished"
        );
        Ok(outcome)
    }

    /// Single aggregation pass over finished partitions, in any order.
    pub fn aggregate(mut partitions: Vec<PartitionReport>) -> PartitionedOutcome {
        partitions.sort_by_key(|p| p.range.partition);
        let stats = JobStats::aggregate(partitions.iter().map(|p| &p.stats));
        PartitionedOutcome { stats, partitions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_grows_one_worker_per_overflowing_partition() {
        let pool = PoolConfig {
            core_size: 2,
            max_size: 4,
            queue_capacity: 10,
        };
        assert_eq!(pool.workers_for(1), 1);
        assert_eq!(pool.workers_for(4), 2);
        assert_eq!(pool.workers_for(12), 2);
        assert_eq!(pool.workers_for(13), 3);
        assert_eq!(pool.workers_for(14), 4);
        assert_eq!(pool.workers_for(20), 4);
    }

    #[test]
    fn defaults_follow_settings() {
        let pool = PoolConfig::default();
        assert_eq!((pool.core_size, pool.max_size, pool.queue_capacity), (2, 4, 10));
    }
}
