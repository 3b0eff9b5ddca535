//! Error types for the headless runner
//!
//! Boot errors are distinguished from configuration errors so the caller
//! can tell "could not even start" apart from malformed input.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the headless runner
#[derive(Error, Debug)]
pub enum Error {
    // === Boot Errors ===
    #[error("Failed to start '{path}': {reason}")]
    Boot { path: String, reason: String },

    #[error("Graphics backend failed to initialize: {0}")]
    GraphicsInit(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid defaults file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

impl Error {
    /// Create a boot error for a target path
    pub fn boot(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Boot {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
