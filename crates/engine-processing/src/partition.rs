use crate::error::PartitionError;
use engine_core::connectors::source::RecordSource;
use model::execution::partition::PartitionDescriptor;
use tracing::{debug, info};

/// Splits the data lines of an input (`2..=total_lines`, line 1 being the
/// header) into at most `grid_size` contiguous, disjoint ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangePartitioner;

impl RangePartitioner {
    /// Inputs are signed so that negative values can be rejected rather than
    /// wrapped.
    pub fn partition(
        total_lines: i64,
        grid_size: i64,
    ) -> Result<Vec<PartitionDescriptor>, PartitionError> {
        if total_lines < 0 {
            return Err(PartitionError::InvalidInput(format!(
                "total_lines must not be negative, got {total_lines}"
            )));
        }
        if grid_size <= 0 {
            return Err(PartitionError::InvalidInput(format!(
                "grid_size must be positive, got {grid_size}"
            )));
        }

        info!(total_lines, grid_size, "Partitioning input");
        if total_lines <= 1 {
            info!("No data lines, nothing to partition");
            return Ok(Vec::new());
        }

        let data_lines = total_lines - 1;
        let per_partition = (data_lines / grid_size).max(1);

        let mut partitions = Vec::new();
        for i in 0..grid_size {
            let start = i * per_partition + 2;
            if start > total_lines {
                break;
            }
            // The last partition absorbs the remainder.
            let end = if i == grid_size - 1 {
                total_lines
            } else {
                (start + per_partition - 1).min(total_lines)
            };

            let descriptor = PartitionDescriptor::new(i as usize, start as u64, end as u64);
            debug!(
                partition = %descriptor.name(),
                start_line = descriptor.start_line,
                end_line = descriptor.end_line,
                size = descriptor.len(),
                "Partition range"
            );
            partitions.push(descriptor);
        }

        info!(partitions = partitions.len(), "Partitions created");
        Ok(partitions)
    }

    /// Counts the source lines in one scan, then partitions them.
    pub fn partition_source(
        source: &dyn RecordSource,
        grid_size: i64,
    ) -> Result<Vec<PartitionDescriptor>, PartitionError> {
        let total = source.count_total_lines()?;
        let total = i64::try_from(total).map_err(|_| {
            PartitionError::InvalidInput(format!("line count {total} is out of range"))
        })?;
        Self::partition(total, grid_size)
    }
}
