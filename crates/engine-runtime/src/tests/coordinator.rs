use super::{PanickingSink, ReverseOrderSink, row, source_with_rows};
use crate::coordinator::{PartitionCoordinator, PoolConfig};
use connectors::sink::MemorySink;
use engine_core::{connectors::source::InMemorySource, retry::RetryPolicy};
use engine_config::settings::RetryExhaustedAction;
use engine_processing::{
    chunk::{ChunkExecutor, ChunkPolicy, FaultTolerance},
    error::StepError,
    partition::RangePartitioner,
    transform::RecordTransformer,
};
use model::execution::{stats::Counters, status::BatchStatus};
use std::{sync::Arc, time::Duration};

fn tolerance(skip_limit: u64) -> FaultTolerance {
    FaultTolerance {
        skip_limit,
        retry: RetryPolicy::from_retry_limit(0, Duration::ZERO),
        retry_exhausted: RetryExhaustedAction::Fail,
        transform_timeout: None,
    }
}

fn sum(counters: impl Iterator<Item = Counters>) -> Counters {
    counters.fold(Counters::default(), |mut acc, c| {
        acc += c;
        acc
    })
}

#[tokio::test]
async fn aggregate_equals_partition_sums_under_reversed_completion() {
    let source = Arc::new(source_with_rows(40));
    let sink = MemorySink::new();
    let executor = ChunkExecutor::new(
        source.clone(),
        Arc::new(ReverseOrderSink {
            inner: sink.clone(),
        }),
        RecordTransformer::default(),
        ChunkPolicy::plain(4),
    );
    let descriptors = RangePartitioner::partition_source(source.as_ref(), 4).unwrap();
    let pool = PoolConfig {
        core_size: 4,
        max_size: 4,
        queue_capacity: 10,
    };

    let outcome = PartitionCoordinator::new(executor, pool)
        .run(descriptors)
        .await
        .unwrap();

    let indexes: Vec<_> = outcome.partitions.iter().map(|p| p.range.partition).collect();
    assert_eq!(indexes, vec![Some(0), Some(1), Some(2), Some(3)]);
    assert!(outcome.is_success());

    let expected = sum(outcome.partitions.iter().map(|p| p.stats.counters));
    assert_eq!(outcome.stats.counters, expected);
    assert_eq!(outcome.stats.counters.read_count, 40);
    assert_eq!(outcome.stats.counters.write_count, 40);
    assert_eq!(sink.len().await, 40);
}

#[tokio::test]
async fn aggregation_ignores_report_order() {
    let source = Arc::new(source_with_rows(23));
    let executor = ChunkExecutor::new(
        source.clone(),
        Arc::new(MemorySink::new()),
        RecordTransformer::default(),
        ChunkPolicy::plain(3),
    );
    let descriptors = RangePartitioner::partition_source(source.as_ref(), 5).unwrap();

    let mut reports = Vec::new();
    for descriptor in descriptors.iter().rev() {
        reports.push(executor.execute_partition(descriptor).await);
    }
    let expected = sum(reports.iter().map(|r| r.stats.counters));

    let outcome = PartitionCoordinator::aggregate(reports);
    assert_eq!(outcome.stats.counters, expected);
    assert_eq!(outcome.stats.step_count, 5);
    assert!(
        outcome
            .partitions
            .windows(2)
            .all(|w| w[0].range.partition < w[1].range.partition)
    );
}

#[tokio::test]
async fn failed_partition_does_not_cancel_siblings() {
    // Partition 1 (lines 5..=7) holds two invalid rows with a skip limit of 1.
    let rows = (1..=12).map(|u| {
        let status = if u == 4 || u == 5 { "broken" } else { "ROAMING" };
        row(u, "DEV001", status)
    });
    let source = Arc::new(InMemorySource::with_header(rows));
    let sink = MemorySink::new();
    let executor = ChunkExecutor::new(
        source.clone(),
        Arc::new(sink.clone()),
        RecordTransformer::default(),
        ChunkPolicy::fault_tolerant(10, tolerance(1)),
    );
    let descriptors = RangePartitioner::partition_source(source.as_ref(), 4).unwrap();

    let outcome = PartitionCoordinator::new(executor, PoolConfig::default())
        .run(descriptors)
        .await
        .unwrap();

    assert_eq!(outcome.stats.status, BatchStatus::Failed);
    assert_eq!(outcome.stats.failed_steps, 1);
    let failed: Vec<_> = outcome.failed_partitions().map(|p| p.name().to_string()).collect();
    assert_eq!(failed, vec!["partition1"]);
    // Three partitions of three rows each committed.
    assert_eq!(outcome.stats.counters.write_count, 9);
    assert_eq!(sink.len().await, 9);
}

#[tokio::test]
async fn bounded_queue_runs_every_partition() {
    let source = Arc::new(source_with_rows(30));
    let sink = MemorySink::new();
    let executor = ChunkExecutor::new(
        source.clone(),
        Arc::new(sink.clone()),
        RecordTransformer::default(),
        ChunkPolicy::plain(2),
    );
    let descriptors = RangePartitioner::partition_source(source.as_ref(), 30).unwrap();
    assert_eq!(descriptors.len(), 30);
    let pool = PoolConfig {
        core_size: 1,
        max_size: 2,
        queue_capacity: 1,
    };

    let outcome = PartitionCoordinator::new(executor, pool)
        .run(descriptors)
        .await
        .unwrap();

    assert_eq!(outcome.partitions.len(), 30);
    assert_eq!(outcome.stats.counters.write_count, 30);
    assert_eq!(sink.len().await, 30);
}

#[tokio::test]
async fn panicking_partition_fails_alone_and_siblings_finish_first() {
    let source = Arc::new(source_with_rows(4));
    let sink = MemorySink::new();
    let executor = ChunkExecutor::new(
        source.clone(),
        Arc::new(PanickingSink {
            inner: sink.clone(),
            panic_on_user: 1,
            delay: Duration::from_millis(200),
        }),
        RecordTransformer::default(),
        ChunkPolicy::plain(10),
    );
    let descriptors = RangePartitioner::partition_source(source.as_ref(), 2).unwrap();

    let outcome = PartitionCoordinator::new(executor, PoolConfig::default())
        .run(descriptors)
        .await
        .unwrap();

    // Nothing is still running once `run` returns.
    assert_eq!(sink.len().await, 2);
    assert!(!outcome.is_success());
    assert_eq!(outcome.partitions.len(), 2);

    let failed: Vec<_> = outcome.failed_partitions().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].range.partition, Some(0));
    assert!(matches!(failed[0].error, Some(StepError::Aborted { .. })));
    assert_eq!(failed[0].range.start_line, 2);

    let sibling = &outcome.partitions[1];
    assert!(sibling.is_success());
    assert_eq!(sibling.stats.counters.write_count, 2);
    assert_eq!(outcome.stats.counters.write_count, 2);
    assert_eq!(outcome.stats.failed_steps, 1);
}

#[tokio::test]
async fn no_partitions_is_an_empty_success() {
    let executor = ChunkExecutor::new(
        Arc::new(InMemorySource::with_header(Vec::<String>::new())),
        Arc::new(MemorySink::new()),
        RecordTransformer::default(),
        ChunkPolicy::plain(10),
    );
    let outcome = PartitionCoordinator::new(executor, PoolConfig::default())
        .run(Vec::new())
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(outcome.partitions.is_empty());
}
