//! Process-level error type for the healthcheck crates.

use std::fmt;

/// A specialized Result type for healthcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for healthcheck operations.
///
/// Probe faults never show up here; they are folded into DOWN outcomes by
/// the executor. Only setup-time failures (configuration, registration,
/// binding the transport) escalate to this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new registry error.
    pub fn registry(msg: impl fmt::Display) -> Self {
        Error::Registry(msg.to_string())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new telemetry error.
    pub fn telemetry(msg: impl fmt::Display) -> Self {
        Error::Telemetry(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(anyhow::anyhow!(msg.to_string()))
    }
}
