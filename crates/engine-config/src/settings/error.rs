use thiserror::Error;

/// Errors raised while loading or validating batch settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`BatchSettings`](super::BatchSettings).
    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The .env file is malformed.
    #[error("Invalid env file: {0}")]
    EnvFile(String),

    /// An environment override could not be parsed.
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidEnv {
        key: String,
        value: String,
        message: String,
    },

    /// One or more settings are out of range.
    #[error("Invalid settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
