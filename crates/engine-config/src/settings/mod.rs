use engine_core::connectors::notify::NotifyOn;
use env::EnvManager;
use error::SettingsError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{path::Path, str::FromStr, time::Duration};
use tracing::{debug, info};

pub mod env;
pub mod error;
pub mod validator;

/// What happens to a record whose transient failures outlast the retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryExhaustedAction {
    /// The step fails with a retry-limit error.
    #[default]
    Fail,
    /// The record is skipped and counts against the skip limit.
    Skip,
}

/// Whether an archive error aborts the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    /// Log the error and continue with zero archived files.
    #[default]
    BestEffort,
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            core_size: 2,
            max_size: 4,
            queue_capacity: 10,
        }
    }
}

/// Device-id based fault injection used to exercise skip and retry paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FaultSettings {
    pub enabled: bool,
    pub reject_pattern: String,
    pub delay_pattern: String,
    pub delay_ms: u64,
}

impl Default for FaultSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            reject_pattern: "DEV003".to_string(),
            delay_pattern: "DEV007".to_string(),
            delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveSettings {
    pub source_dir: String,
    pub backup_dir: String,
    pub file_pattern: String,
    pub policy: ArchivePolicy,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            source_dir: "data".to_string(),
            backup_dir: "backup".to_string(),
            file_pattern: "*.csv".to_string(),
            policy: ArchivePolicy::default(),
        }
    }
}

/// Tunables of a batch run. Every field has a default, so an empty JSON
/// object is a valid settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Items per committed chunk.
    pub chunk_size: usize,
    /// Maximum validation failures skipped per step (per partition).
    pub skip_limit: u64,
    /// Retries after the initial attempt for transient failures.
    pub retry_limit: usize,
    pub retry_backoff_ms: u64,
    pub retry_exhausted: RetryExhaustedAction,
    pub transform_timeout_ms: Option<u64>,
    pub grid_size: usize,
    pub pool: PoolSettings,
    pub faults: FaultSettings,
    pub archive: ArchiveSettings,
    pub notify_on: NotifyOn,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            skip_limit: 5,
            retry_limit: 3,
            retry_backoff_ms: 0,
            retry_exhausted: RetryExhaustedAction::default(),
            transform_timeout_ms: None,
            grid_size: 4,
            pool: PoolSettings::default(),
            faults: FaultSettings::default(),
            archive: ArchiveSettings::default(),
            notify_on: NotifyOn::default(),
        }
    }
}

impl BatchSettings {
    /// Defaults, then the optional JSON file, then `ROAMING_*` overrides.
    /// The result is validated.
    pub fn load(config: Option<&Path>, env: &EnvManager) -> Result<Self, SettingsError> {
        let mut settings = match config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(env)?;
        settings.validate()?;

        info!(
            chunk_size = settings.chunk_size,
            skip_limit = settings.skip_limit,
            retry_limit = settings.retry_limit,
            grid_size = settings.grid_size,
            core_size = settings.pool.core_size,
            max_size = settings.pool.max_size,
            queue_capacity = settings.pool.queue_capacity,
            "Batch settings loaded"
        );
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Applies every `ROAMING_*` variable present in `env`.
    pub fn apply_env(&mut self, env: &EnvManager) -> Result<(), SettingsError> {
        override_parsed(env, "ROAMING_CHUNK_SIZE", &mut self.chunk_size)?;
        override_parsed(env, "ROAMING_SKIP_LIMIT", &mut self.skip_limit)?;
        override_parsed(env, "ROAMING_RETRY_LIMIT", &mut self.retry_limit)?;
        override_parsed(env, "ROAMING_RETRY_BACKOFF_MS", &mut self.retry_backoff_ms)?;
        override_named(env, "ROAMING_RETRY_EXHAUSTED", &mut self.retry_exhausted)?;
        if let Some(raw) = env.get("ROAMING_TRANSFORM_TIMEOUT_MS") {
            self.transform_timeout_ms = match raw.trim() {
                "" | "none" => None,
                value => Some(parse_value("ROAMING_TRANSFORM_TIMEOUT_MS", value)?),
            };
        }
        override_parsed(env, "ROAMING_GRID_SIZE", &mut self.grid_size)?;

        override_parsed(env, "ROAMING_POOL_CORE_SIZE", &mut self.pool.core_size)?;
        override_parsed(env, "ROAMING_POOL_MAX_SIZE", &mut self.pool.max_size)?;
        override_parsed(env, "ROAMING_POOL_QUEUE_CAPACITY", &mut self.pool.queue_capacity)?;

        override_parsed(env, "ROAMING_FAULTS_ENABLED", &mut self.faults.enabled)?;
        override_string(env, "ROAMING_FAULTS_REJECT_PATTERN", &mut self.faults.reject_pattern);
        override_string(env, "ROAMING_FAULTS_DELAY_PATTERN", &mut self.faults.delay_pattern);
        override_parsed(env, "ROAMING_FAULTS_DELAY_MS", &mut self.faults.delay_ms)?;

        override_string(env, "ROAMING_ARCHIVE_SOURCE_DIR", &mut self.archive.source_dir);
        override_string(env, "ROAMING_ARCHIVE_BACKUP_DIR", &mut self.archive.backup_dir);
        override_string(env, "ROAMING_ARCHIVE_FILE_PATTERN", &mut self.archive.file_pattern);
        override_named(env, "ROAMING_ARCHIVE_POLICY", &mut self.archive.policy)?;

        override_named(env, "ROAMING_NOTIFY_ON", &mut self.notify_on)?;
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn transform_timeout(&self) -> Option<Duration> {
        self.transform_timeout_ms.map(Duration::from_millis)
    }

    pub fn fault_delay(&self) -> Duration {
        Duration::from_millis(self.faults.delay_ms)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn override_parsed<T>(env: &EnvManager, key: &str, target: &mut T) -> Result<(), SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env.get(key) {
        *target = parse_value(key, value)?;
        debug!(key, value, "Applied environment override");
    }
    Ok(())
}

fn override_string(env: &EnvManager, key: &str, target: &mut String) {
    if let Some(value) = env.get(key) {
        *target = value.to_string();
        debug!(key, value, "Applied environment override");
    }
}

/// Parses a unit enum through its serde name (e.g. `best_effort`).
fn override_named<T>(env: &EnvManager, key: &str, target: &mut T) -> Result<(), SettingsError>
where
    T: DeserializeOwned,
{
    if let Some(value) = env.get(key) {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        *target = serde_json::from_value(serde_json::Value::String(normalized)).map_err(|e| {
            SettingsError::InvalidEnv {
                key: key.to_string(),
                value: value.to_string(),
                message: e.to_string(),
            }
        })?;
        debug!(key, value, "Applied environment override");
    }
    Ok(())
}
