//! Error types for the core library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a send.
#[derive(Debug, Error)]
pub enum Error {
    /// A required SMTP setting is blank. Raised before any I/O.
    #[error("Missing one or more parameters (Smtp Server, User Name, Password or From Email Address).")]
    Configuration,

    /// The SMTP transport failed (connect, authenticate, envelope or data).
    #[error(transparent)]
    Transport(#[from] mailbridge_smtp::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document root is not a JSON object.
    #[error("Configuration root must be a JSON object")]
    NotAnObject,
}
