use model::execution::{
    stats::{Counters, StepStats},
    status::BatchStatus,
};

/// Counters of one executing partition. Owned by that partition's executor;
/// never shared between tasks.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    stats: StepStats,
}

impl StatsCollector {
    pub fn start() -> Self {
        Self {
            stats: StepStats::started(),
        }
    }

    pub fn increment_reads(&mut self, count: u64) {
        self.stats.counters.read_count += count;
    }

    /// Applies a committed chunk.
    pub fn record_commit(&mut self, chunk: &Counters) {
        self.absorb(chunk);
        self.stats.counters.write_count += chunk.write_count;
        self.stats.counters.commit_count += 1;
    }

    /// Adds the skips and retries of a chunk that never reached the sink.
    pub fn absorb(&mut self, chunk: &Counters) {
        self.stats.counters.skip_count += chunk.skip_count;
        self.stats.counters.retry_count += chunk.retry_count;
    }

    /// A failed commit. Nothing from the chunk is counted.
    pub fn record_rollback(&mut self) {
        self.stats.counters.rollback_count += 1;
    }

    pub fn counters(&self) -> &Counters {
        &self.stats.counters
    }

    /// Copy of the running stats.
    pub fn snapshot(&self) -> StepStats {
        self.stats.clone()
    }

    pub fn finish(self, status: BatchStatus) -> StepStats {
        self.stats.freeze(status)
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::start()
    }
}
