use crate::{
    chunk::policy::{ChunkPolicy, FaultTolerance},
    error::StepError,
    transform::{error::TransformError, record::RecordTransformer},
};
use engine_config::settings::RetryExhaustedAction;
use engine_core::{
    connectors::{sink::RecordSink, source::RecordSource},
    error::SourceError,
    metrics::StatsCollector,
    retry::{Attempted, RetryDisposition, RetryError},
};
use model::{
    execution::{
        chunk::{ChunkOutcome, RetriedItem, SkippedItem},
        failed_row::{FailedRecord, ProcessingStage},
        partition::PartitionDescriptor,
        stats::{Counters, StepStats},
        status::BatchStatus,
        step::StepExecution,
    },
    records::{entity::RoamingStatusEntity, raw::RawRecord},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// Lines covered by one executor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRange {
    pub name: String,
    pub partition: Option<usize>,
    pub start_line: u64,
    /// Inclusive; `None` reads to the end of the input.
    pub end_line: Option<u64>,
}

impl ExecutionRange {
    /// Every data line of the input (line 2 onwards).
    pub fn whole(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition: None,
            start_line: 2,
            end_line: None,
        }
    }

    pub fn max_records(&self) -> Option<u64> {
        self.end_line
            .map(|end| end.saturating_sub(self.start_line) + 1)
    }
}

impl From<&PartitionDescriptor> for ExecutionRange {
    fn from(descriptor: &PartitionDescriptor) -> Self {
        Self {
            name: descriptor.name(),
            partition: Some(descriptor.index),
            start_line: descriptor.start_line,
            end_line: Some(descriptor.end_line),
        }
    }
}

/// Everything an executor run produced, successful or not.
#[derive(Debug)]
pub struct PartitionReport {
    pub range: ExecutionRange,
    /// Frozen at the end of the run.
    pub stats: StepStats,
    pub chunks: Vec<ChunkOutcome>,
    pub failures: Vec<FailedRecord>,
    pub error: Option<StepError>,
}

impl PartitionReport {
    /// Report for a range whose task died before producing one. Whatever
    /// it committed is not reflected in the stats.
    pub fn aborted(range: ExecutionRange, reason: impl Into<String>) -> Self {
        let stats = StepStats::started().freeze(BatchStatus::Failed);
        Self {
            range,
            stats: stats.clone(),
            chunks: Vec::new(),
            failures: Vec::new(),
            error: Some(StepError::Aborted {
                reason: reason.into(),
                stats,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.range.name
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> BatchStatus {
        self.stats.status
    }

    /// Step execution with the fatal error first, followed by every skipped
    /// or failed record.
    pub fn to_step_execution(&self) -> StepExecution {
        let mut execution = StepExecution::new(self.range.name.clone(), self.stats.clone())
            .with_detail("chunks", self.chunks.len() as u64)
            .with_detail("start_line", self.range.start_line);
        if let Some(end) = self.range.end_line {
            execution = execution.with_detail("end_line", end);
        }
        if let Some(err) = &self.error {
            execution = execution.with_failure(format!("{}: {}", self.range.name, err));
        }
        for failure in &self.failures {
            execution = execution.with_failure(failure.describe());
        }
        execution
    }
}

/// Records read since the last commit.
#[derive(Debug, Default)]
struct ChunkBuffer {
    items: Vec<RoamingStatusEntity>,
    attempted: u64,
    last_line: u64,
    skipped: Vec<SkippedItem>,
    retried: Vec<RetriedItem>,
    counters: Counters,
}

impl ChunkBuffer {
    fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    fn record_attempts(&mut self, line: u64, attempts: usize) {
        if attempts > 1 {
            self.counters.retry_count += (attempts - 1) as u64;
            self.retried.push(RetriedItem {
                line,
                attempts: attempts as u32,
            });
        }
    }
}

struct RunState {
    name: String,
    collector: StatsCollector,
    buffer: ChunkBuffer,
    chunks: Vec<ChunkOutcome>,
    failures: Vec<FailedRecord>,
    next_sequence: u64,
}

impl RunState {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collector: StatsCollector::start(),
            buffer: ChunkBuffer::default(),
            chunks: Vec::new(),
            failures: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Folds the uncommitted skips and retries into the stats and returns
    /// the snapshot a fatal error carries.
    fn fatal_snapshot(&mut self) -> StepStats {
        let pending = std::mem::take(&mut self.buffer.counters);
        self.collector.absorb(&pending);
        self.collector.snapshot().freeze(BatchStatus::Failed)
    }

    fn record_failure(
        &mut self,
        stage: ProcessingStage,
        raw: Option<&RawRecord>,
        line: u64,
        error_type: &str,
        message: String,
        attempts: usize,
        retryable: bool,
    ) {
        let mut failure = FailedRecord::new(self.name.clone(), stage, line, error_type, message)
            .with_attempt(attempts as u32)
            .with_retryable(retryable);
        if let Some(raw) = raw {
            failure = failure.with_original(raw);
        }
        self.failures.push(failure);
    }

    fn into_report(self, range: ExecutionRange, result: Result<(), StepError>) -> PartitionReport {
        let status = if result.is_ok() {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        PartitionReport {
            range,
            stats: self.collector.finish(status),
            chunks: self.chunks,
            failures: self.failures,
            error: result.err(),
        }
    }
}

/// Reads a line range, transforms each record and commits the results in
/// chunks of `chunk_size` records read.
#[derive(Clone)]
pub struct ChunkExecutor {
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink>,
    transformer: RecordTransformer,
    policy: ChunkPolicy,
}

impl ChunkExecutor {
    pub fn new(
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn RecordSink>,
        transformer: RecordTransformer,
        policy: ChunkPolicy,
    ) -> Self {
        Self {
            source,
            sink,
            transformer,
            policy,
        }
    }

    pub fn policy(&self) -> &ChunkPolicy {
        &self.policy
    }

    pub async fn execute_partition(&self, descriptor: &PartitionDescriptor) -> PartitionReport {
        self.execute(ExecutionRange::from(descriptor)).await
    }

    /// Runs the range to completion or to the first fatal error. Chunks
    /// committed before a failure stay committed.
    pub async fn execute(&self, range: ExecutionRange) -> PartitionReport {
        info!(
            step = %range.name,
            start_line = range.start_line,
            end_line = ?range.end_line,
            chunk_size = self.policy.chunk_size,
            fault_tolerant = self.policy.is_fault_tolerant(),
            "Step started"
        );

        let mut state = RunState::new(&range.name);
        let result = self.drive(&range, &mut state).await;
        let report = state.into_report(range, result);

        let counters = &report.stats.counters;
        match &report.error {
            None => info!(
                step = %report.name(),
                read = counters.read_count,
                written = counters.write_count,
                skipped = counters.skip_count,
                retried = counters.retry_count,
                commits = counters.commit_count,
                duration_ms = report.stats.duration().as_millis() as u64,
                "Step completed"
            ),
            Some(err) => error!(
                step = %report.name(),
                error = %err,
                read = counters.read_count,
                written = counters.write_count,
                skipped = counters.skip_count,
                retried = counters.retry_count,
                commits = counters.commit_count,
                rollbacks = counters.rollback_count,
                "Step failed"
            ),
        }

        report
    }

    async fn drive(&self, range: &ExecutionRange, state: &mut RunState) -> Result<(), StepError> {
        let mut records = match self.source.open_at(range.start_line) {
            Ok(records) => records,
            Err(source) => return Err(Self::read_error(state, range.start_line, source)),
        };

        let max_records = range.max_records();
        let mut consumed = 0u64;

        loop {
            if max_records.is_some_and(|max| consumed >= max) {
                break;
            }
            let raw = match records.next() {
                None => break,
                Some(Ok(raw)) => raw,
                Some(Err(source)) => {
                    let line = range.start_line + consumed;
                    return Err(Self::read_error(state, line, source));
                }
            };
            if range.end_line.is_some_and(|end| raw.line > end) {
                break;
            }

            consumed += 1;
            state.collector.increment_reads(1);
            state.buffer.attempted += 1;
            state.buffer.last_line = raw.line;

            self.process(raw, state).await?;

            if state.buffer.attempted >= self.policy.chunk_size as u64 {
                self.commit(state).await?;
            }
        }

        if !state.buffer.is_empty() {
            self.commit(state).await?;
        }
        Ok(())
    }

    async fn process(&self, raw: RawRecord, state: &mut RunState) -> Result<(), StepError> {
        let Some(tolerance) = &self.policy.fault_tolerance else {
            return match self.transformer.transform(&raw).await {
                Ok(entity) => {
                    state.buffer.items.push(entity);
                    Ok(())
                }
                Err(source) => {
                    state.record_failure(
                        ProcessingStage::Transform,
                        Some(&raw),
                        raw.line,
                        source.kind(),
                        source.to_string(),
                        1,
                        source.is_retryable(),
                    );
                    let stats = state.fatal_snapshot();
                    Err(StepError::ItemFailed {
                        line: raw.line,
                        source,
                        stats,
                    })
                }
            };
        };

        let outcome = tolerance
            .retry
            .run(
                || self.attempt(&raw, tolerance.transform_timeout),
                |err: &TransformError| {
                    if err.is_retryable() {
                        RetryDisposition::Retry
                    } else {
                        RetryDisposition::Stop
                    }
                },
            )
            .await;

        match outcome {
            Ok(Attempted { value, attempts }) => {
                state.buffer.record_attempts(raw.line, attempts);
                if attempts > 1 {
                    debug!(step = %state.name, line = raw.line, attempts, "Record recovered after retry");
                }
                state.buffer.items.push(value);
                Ok(())
            }
            Err(RetryError::Fatal { error, attempts }) => {
                state.buffer.record_attempts(raw.line, attempts);
                Self::skip(tolerance, &raw, error, attempts, state)
            }
            Err(RetryError::AttemptsExceeded { error, attempts }) => {
                state.buffer.record_attempts(raw.line, attempts);
                warn!(
                    step = %state.name,
                    line = raw.line,
                    attempts,
                    error = %error,
                    "Retry attempts exhausted"
                );
                match tolerance.retry_exhausted {
                    RetryExhaustedAction::Skip => Self::skip(tolerance, &raw, error, attempts, state),
                    RetryExhaustedAction::Fail => {
                        state.record_failure(
                            ProcessingStage::Transform,
                            Some(&raw),
                            raw.line,
                            error.kind(),
                            error.to_string(),
                            attempts,
                            true,
                        );
                        let stats = state.fatal_snapshot();
                        Err(StepError::RetryLimitExceeded {
                            limit: tolerance.retry.retry_limit(),
                            line: raw.line,
                            attempts,
                            reason: error.to_string(),
                            stats,
                        })
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        raw: &RawRecord,
        timeout: Option<Duration>,
    ) -> Result<RoamingStatusEntity, TransformError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.transformer.transform(raw))
                .await
                .unwrap_or(Err(TransformError::Timeout(limit))),
            None => self.transformer.transform(raw).await,
        }
    }

    /// Skips `raw`, or fails the step when the skip would exceed the limit.
    /// The record that crosses the limit is not counted.
    fn skip(
        tolerance: &FaultTolerance,
        raw: &RawRecord,
        error: TransformError,
        attempts: usize,
        state: &mut RunState,
    ) -> Result<(), StepError> {
        let reason = error.to_string();
        state.record_failure(
            ProcessingStage::Transform,
            Some(raw),
            raw.line,
            error.kind(),
            reason.clone(),
            attempts,
            error.is_retryable(),
        );

        let skipped_so_far = state.collector.counters().skip_count + state.buffer.counters.skip_count;
        if skipped_so_far + 1 > tolerance.skip_limit {
            let stats = state.fatal_snapshot();
            return Err(StepError::SkipLimitExceeded {
                limit: tolerance.skip_limit,
                line: raw.line,
                reason,
                stats,
            });
        }

        warn!(step = %state.name, line = raw.line, %reason, "Skipping record");
        state.buffer.counters.skip_count += 1;
        state.buffer.skipped.push(SkippedItem {
            line: raw.line,
            reason,
            attempts: attempts as u32,
        });
        Ok(())
    }

    async fn commit(&self, state: &mut RunState) -> Result<(), StepError> {
        let ChunkBuffer {
            items,
            attempted,
            last_line,
            skipped,
            retried,
            counters,
        } = std::mem::take(&mut state.buffer);
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let size = items.len();
        let written = if items.is_empty() {
            0
        } else {
            match self.sink.write_chunk(items).await {
                Ok(written) => written as u64,
                Err(source) => {
                    state.collector.record_rollback();
                    state.record_failure(
                        ProcessingStage::Write,
                        None,
                        last_line,
                        "CommitFailed",
                        source.to_string(),
                        1,
                        false,
                    );
                    error!(step = %state.name, sequence, size, error = %source, "Chunk rolled back");
                    let stats = state.collector.snapshot().freeze(BatchStatus::Failed);
                    return Err(StepError::CommitFailed {
                        sequence,
                        source,
                        stats,
                    });
                }
            }
        };

        state.collector.record_commit(&Counters {
            write_count: written,
            ..counters
        });
        debug!(
            step = %state.name,
            sequence,
            attempted,
            written,
            skipped = skipped.len(),
            "Chunk committed"
        );
        state.chunks.push(ChunkOutcome {
            sequence,
            attempted,
            written,
            skipped,
            retried,
        });
        Ok(())
    }

    fn read_error(state: &mut RunState, line: u64, source: SourceError) -> StepError {
        state.record_failure(
            ProcessingStage::Read,
            None,
            line,
            "Read",
            source.to_string(),
            1,
            false,
        );
        let stats = state.fatal_snapshot();
        StepError::Read { source, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::fault::{FaultInjectionStrategy, InjectedFault, NoFaults};
    use connectors::sink::MemorySink;
    use engine_core::{connectors::source::InMemorySource, retry::RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn good(user: u64) -> String {
        format!("{user},DEV{user:03},Seoul,2024-01-01T10:00:00,CONNECTED")
    }

    fn bad(user: u64) -> String {
        format!("{user},DEV{user:03},Seoul,2024-01-01T10:00:00,unknown")
    }

    fn tolerance(skip_limit: u64, retry_limit: usize) -> FaultTolerance {
        FaultTolerance {
            skip_limit,
            retry: RetryPolicy::from_retry_limit(retry_limit, Duration::ZERO),
            retry_exhausted: RetryExhaustedAction::Fail,
            transform_timeout: None,
        }
    }

    fn executor(
        rows: Vec<String>,
        sink: &MemorySink,
        faults: Arc<dyn FaultInjectionStrategy>,
        policy: ChunkPolicy,
    ) -> ChunkExecutor {
        ChunkExecutor::new(
            Arc::new(InMemorySource::with_header(rows)),
            Arc::new(sink.clone()),
            RecordTransformer::new(faults),
            policy,
        )
    }

    /// Fails every attempt for devices containing the pattern and counts them.
    struct AlwaysTransient {
        pattern: &'static str,
        attempts: AtomicUsize,
    }

    impl FaultInjectionStrategy for AlwaysTransient {
        fn inspect(&self, record: &RawRecord) -> Option<InjectedFault> {
            if record.device_id.contains(self.pattern) {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Some(InjectedFault::Transient("downstream busy".into()))
            } else {
                None
            }
        }
    }

    /// Fails the first attempt of every record.
    #[derive(Default)]
    struct FlakyFirstAttempt {
        seen: std::sync::Mutex<std::collections::HashSet<u64>>,
    }

    impl FaultInjectionStrategy for FlakyFirstAttempt {
        fn inspect(&self, record: &RawRecord) -> Option<InjectedFault> {
            let mut seen = self.seen.lock().unwrap();
            if seen.insert(record.line) {
                Some(InjectedFault::Transient("first attempt".into()))
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn plain_mode_commits_full_and_trailing_chunks() {
        let sink = MemorySink::new();
        let rows = (1..=25).map(good).collect();
        let report = executor(rows, &sink, Arc::new(NoFaults), ChunkPolicy::plain(10))
            .execute(ExecutionRange::whole("chunkStep"))
            .await;

        assert!(report.is_success());
        assert_eq!(report.status(), BatchStatus::Completed);
        assert_eq!(report.stats.counters.read_count, 25);
        assert_eq!(report.stats.counters.write_count, 25);
        assert_eq!(report.stats.counters.commit_count, 3);
        let sizes: Vec<_> = report.chunks.iter().map(|c| c.written).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(sink.len().await, 25);
    }

    #[tokio::test]
    async fn plain_mode_stops_at_first_bad_record() {
        let sink = MemorySink::new();
        let rows = vec![good(1), good(2), bad(3), good(4)];
        let report = executor(rows, &sink, Arc::new(NoFaults), ChunkPolicy::plain(2))
            .execute(ExecutionRange::whole("chunkStep"))
            .await;

        let Some(StepError::ItemFailed { line, stats, .. }) = &report.error else {
            panic!("expected item failure, got {:?}", report.error);
        };
        assert_eq!(*line, 4);
        assert_eq!(stats.counters.write_count, 2);
        assert_eq!(report.stats.counters.read_count, 3);
        assert_eq!(report.stats.counters.skip_count, 0);
        assert_eq!(report.status(), BatchStatus::Failed);
        assert_eq!(sink.len().await, 2);
    }

    #[tokio::test]
    async fn skip_limit_fails_after_limit_th_skip() {
        let sink = MemorySink::new();
        let mut rows = vec![good(1)];
        rows.extend((2..=7).map(bad));
        rows.push(good(8));

        let report = executor(
            rows,
            &sink,
            Arc::new(NoFaults),
            ChunkPolicy::fault_tolerant(3, tolerance(5, 0)),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        let Some(StepError::SkipLimitExceeded { limit, line, stats, .. }) = &report.error else {
            panic!("expected skip limit failure, got {:?}", report.error);
        };
        assert_eq!(*limit, 5);
        // Sixth invalid record: file line 8.
        assert_eq!(*line, 8);
        assert_eq!(stats.counters.skip_count, 5);
        assert_eq!(report.stats.counters.skip_count, 5);
        assert_eq!(report.stats.counters.read_count, 7);
    }

    #[tokio::test]
    async fn skips_up_to_the_limit_complete() {
        let sink = MemorySink::new();
        let mut rows: Vec<String> = (2..=6).map(bad).collect();
        rows.push(good(7));

        let report = executor(
            rows,
            &sink,
            Arc::new(NoFaults),
            ChunkPolicy::fault_tolerant(10, tolerance(5, 0)),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        assert!(report.is_success());
        assert_eq!(report.stats.counters.skip_count, 5);
        assert_eq!(report.stats.counters.write_count, 1);
        assert_eq!(report.chunks[0].skip_count(), 5);
        assert_eq!(report.failures.len(), 5);
        assert!(report.to_step_execution().failures[0].contains("Invalid status"));
    }

    #[tokio::test]
    async fn retry_limit_means_limit_plus_one_attempts() {
        let sink = MemorySink::new();
        let faults = Arc::new(AlwaysTransient {
            pattern: "DEV002",
            attempts: AtomicUsize::new(0),
        });
        let report = executor(
            vec![good(1), good(2), good(3)],
            &sink,
            faults.clone(),
            ChunkPolicy::fault_tolerant(10, tolerance(5, 3)),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        assert_eq!(faults.attempts.load(Ordering::SeqCst), 4);
        let Some(StepError::RetryLimitExceeded { attempts, limit, line, .. }) = &report.error
        else {
            panic!("expected retry limit failure, got {:?}", report.error);
        };
        assert_eq!((*attempts, *limit, *line), (4, 3, 3));
        assert_eq!(report.stats.counters.retry_count, 3);
        assert_eq!(report.stats.counters.write_count, 0);
    }

    #[tokio::test]
    async fn exhausted_retries_can_skip() {
        let sink = MemorySink::new();
        let faults = Arc::new(AlwaysTransient {
            pattern: "DEV002",
            attempts: AtomicUsize::new(0),
        });
        let mut tolerance = tolerance(5, 2);
        tolerance.retry_exhausted = RetryExhaustedAction::Skip;

        let report = executor(
            vec![good(1), good(2), good(3)],
            &sink,
            faults,
            ChunkPolicy::fault_tolerant(10, tolerance),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        assert!(report.is_success());
        assert_eq!(report.stats.counters.skip_count, 1);
        assert_eq!(report.stats.counters.retry_count, 2);
        assert_eq!(report.stats.counters.write_count, 2);
        assert_eq!(report.chunks[0].skipped[0].attempts, 3);
    }

    #[tokio::test]
    async fn transient_failures_recover() {
        let sink = MemorySink::new();
        let report = executor(
            (1..=4).map(good).collect(),
            &sink,
            Arc::new(FlakyFirstAttempt::default()),
            ChunkPolicy::fault_tolerant(2, tolerance(0, 1)),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        assert!(report.is_success());
        assert_eq!(report.stats.counters.write_count, 4);
        assert_eq!(report.stats.counters.retry_count, 4);
        assert_eq!(report.chunks[0].retry_count(), 2);
        assert_eq!(report.chunks[1].retried[0].attempts, 2);
    }

    #[tokio::test]
    async fn failed_commit_keeps_prior_chunks() {
        let sink = MemorySink::new();
        sink.fail_on_commit(2).await;
        let report = executor(
            (1..=9).map(good).collect(),
            &sink,
            Arc::new(NoFaults),
            ChunkPolicy::fault_tolerant(3, tolerance(5, 3)),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        let Some(StepError::CommitFailed { sequence, stats, .. }) = &report.error else {
            panic!("expected commit failure, got {:?}", report.error);
        };
        assert_eq!(*sequence, 1);
        assert_eq!(stats.counters.write_count, 3);
        assert_eq!(stats.counters.commit_count, 1);
        assert_eq!(stats.counters.rollback_count, 1);
        assert_eq!(report.stats.counters.read_count, 6);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(sink.len().await, 3);
    }

    #[tokio::test]
    async fn partition_reads_only_its_range() {
        let sink = MemorySink::new();
        let exec = executor(
            (1..=10).map(good).collect(),
            &sink,
            Arc::new(NoFaults),
            ChunkPolicy::plain(10),
        );
        let report = exec
            .execute_partition(&PartitionDescriptor::new(1, 5, 7))
            .await;

        assert_eq!(report.name(), "partition1");
        assert_eq!(report.stats.counters.read_count, 3);
        let users: Vec<_> = sink.items().await.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn slow_transform_times_out_as_transient() {
        struct Slow;
        impl FaultInjectionStrategy for Slow {
            fn inspect(&self, _record: &RawRecord) -> Option<InjectedFault> {
                Some(InjectedFault::Delay(Duration::from_millis(200)))
            }
        }

        let sink = MemorySink::new();
        let mut tolerance = tolerance(5, 1);
        tolerance.transform_timeout = Some(Duration::from_millis(20));
        let report = executor(
            vec![good(1)],
            &sink,
            Arc::new(Slow),
            ChunkPolicy::fault_tolerant(10, tolerance),
        )
        .execute(ExecutionRange::whole("robustStep"))
        .await;

        let Some(StepError::RetryLimitExceeded { attempts, reason, .. }) = &report.error else {
            panic!("expected retry limit failure, got {:?}", report.error);
        };
        assert_eq!(*attempts, 2);
        assert!(reason.contains("timed out"));
    }

    #[tokio::test]
    async fn undecodable_line_stays_inside_its_own_partition() {
        use engine_core::connectors::source::CsvRecordSource;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"userId,deviceId,location,timestamp,status\n").unwrap();
        file.write_all(good(1).as_bytes()).unwrap();
        file.write_all(b"\n2,DEV\xff\xfe,Busan,2024-01-01T10:00:00,ROAMING\n").unwrap();
        file.write_all(format!("{}\n{}\n", good(3), good(4)).as_bytes()).unwrap();

        let sink = MemorySink::new();
        let executor = ChunkExecutor::new(
            Arc::new(CsvRecordSource::new(file.path())),
            Arc::new(sink.clone()),
            RecordTransformer::default(),
            ChunkPolicy::fault_tolerant(10, tolerance(5, 0)),
        );

        let later = executor
            .execute_partition(&PartitionDescriptor::new(1, 4, 5))
            .await;
        assert!(later.is_success(), "unexpected error: {:?}", later.error);
        assert_eq!(later.stats.counters.read_count, 2);
        assert_eq!(later.stats.counters.write_count, 2);

        let owner = executor
            .execute_partition(&PartitionDescriptor::new(0, 2, 3))
            .await;
        assert!(!matches!(owner.error, Some(StepError::Read { .. })));
        assert_eq!(owner.stats.counters.read_count, 2);
    }
}
