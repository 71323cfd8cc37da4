//! Unified error types for Fleetwatch

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Fleetwatch operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    // Node list errors (per-group, non-fatal to a run)
    #[error("Failed to load node list '{path}': {reason}")]
    NodeList { path: PathBuf, reason: String },

    // State file errors
    #[error("Failed to write state file '{path}': {source}")]
    StateWrite { path: PathBuf, source: io::Error },

    #[error("Failed to serialize state: {0}")]
    StateEncode(#[from] serde_json::Error),

    // Notification errors
    #[error("Failed to send notification '{subject}': {reason}")]
    Notify { subject: String, reason: String },
}

/// Result type alias for Fleetwatch operations
pub type Result<T> = std::result::Result<T, Error>;
