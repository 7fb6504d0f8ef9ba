//! Unified error handling for the stroll-tracker library.
//!
//! "No data" is deliberately not represented here: an empty track is a normal
//! outcome and surfaces as `None` / an empty ranking instead of an error.

use thiserror::Error;

/// Unified error type for stroll-tracker operations.
#[derive(Error, Debug)]
pub enum StrollError {
    /// Device identifier failed validation (must start with 15 digits)
    #[error("Invalid device identifier '{input}'")]
    InvalidDeviceId { input: String },

    /// Track source failed while producing points
    #[error("Track source error: {message}")]
    Source { message: String },

    /// SQLite error from the persistent track store
    #[cfg(feature = "persistence")]
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// HTTP transport error while talking to the chat provider
    #[error("HTTP error{}: {message}", .status_code.map(|c| format!(" ({})", c)).unwrap_or_default())]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// Chat provider accepted the request but reported a failure status
    #[error("Messaging provider error code: {status} message: {message}")]
    Messaging { status: i64, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl StrollError {
    /// Creates a Source error for a failing upstream track source
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an Http error
    pub fn http(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status_code,
        }
    }
}

/// Result type alias for stroll-tracker operations.
pub type Result<T> = std::result::Result<T, StrollError>;
