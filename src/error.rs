//! Error types for ddPCR QC.

use thiserror::Error;

/// Main error type for the engine, store and batch driver.
#[derive(Error, Debug)]
pub enum QcError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plate error: {0}")]
    Plate(#[from] PlateError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Malformed or absent plate files.
#[derive(Error, Debug)]
pub enum PlateError {
    #[error("Cannot read plate file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode plate file {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Well {well} has no channel {channel}")]
    MissingChannel { well: String, channel: usize },
}

/// A corrupt metric-record graph. Fatal for the plate being processed.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Plate {plate} has no metric record for well {well}")]
    MissingWellMetric { plate: String, well: String },

    #[error("Well {well} has no metric record for channel {channel}")]
    MissingChannelMetric { well: String, channel: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File operation failed: {0}")]
    FileOperation(String),
}

/// Result type alias for engine operations.
pub type QcResult<T> = Result<T, QcError>;
