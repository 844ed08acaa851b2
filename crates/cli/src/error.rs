use connectors::error::SinkError;
use engine_config::settings::error::SettingsError;
use engine_processing::error::PartitionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to open the sink: {0}")]
    Sink(#[from] SinkError),

    #[error("Failed to partition the input: {0}")]
    Partition(#[from] PartitionError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("The jsonl sink needs --output")]
    MissingOutput,
}
