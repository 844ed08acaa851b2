use crate::settings::{BatchSettings, error::SettingsError};

impl BatchSettings {
    /// Checks ranges and pool sizing, reporting every problem at once.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut problems = Vec::new();

        if self.chunk_size == 0 {
            problems.push("chunk_size must be greater than 0".to_string());
        }
        if self.grid_size == 0 {
            problems.push("grid_size must be greater than 0".to_string());
        }
        if self.pool.core_size == 0 {
            problems.push("pool.core_size must be greater than 0".to_string());
        }
        if self.pool.max_size < self.pool.core_size {
            problems.push(format!(
                "pool.max_size ({}) must be at least pool.core_size ({})",
                self.pool.max_size, self.pool.core_size
            ));
        }
        if self.pool.queue_capacity == 0 {
            problems.push("pool.queue_capacity must be greater than 0".to_string());
        }
        if self.transform_timeout_ms == Some(0) {
            problems.push("transform_timeout_ms must be greater than 0 when set".to_string());
        }
        if self.faults.enabled
            && self.faults.reject_pattern.is_empty()
            && self.faults.delay_pattern.is_empty()
        {
            problems.push("faults.enabled requires a reject or delay pattern".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(problems))
        }
    }
}
