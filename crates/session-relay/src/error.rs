//! Error types for the relay.

use std::path::PathBuf;

/// Errors that can occur while configuring or running the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid event frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
