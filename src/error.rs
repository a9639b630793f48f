//! Error types for confounder-synth

use thiserror::Error;

/// Crate-level error type for file-facing operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Observed dataset error
    #[error("dataset error: {0}")]
    Dataset(#[from] crate::dataset::DatasetError),

    /// Encoding error
    #[error("encoding error: {0}")]
    Encode(#[from] crate::encode::EncodeError),

    /// Network construction error
    #[error("network error: {0}")]
    Network(#[from] crate::network::NetworkError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
