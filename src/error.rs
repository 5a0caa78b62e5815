//! Crate-level error type.

use thiserror::Error;

use crate::bridge::BridgeError;

/// Errors surfaced by the worker processes.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gateway unreachable or registration refused
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// The host closed the gateway connection while serving
    #[error("Gateway connection closed by host")]
    GatewayClosed,

    /// Corpus could not be opened or loaded
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Embedding model failed to load or to encode
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Method dispatch or remote call failure
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result alias for worker operations.
pub type Result<T> = std::result::Result<T, Error>;
