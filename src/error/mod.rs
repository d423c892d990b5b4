//! Error handling module for CutX

use thiserror::Error;

/// Main error type for CutX operations
#[derive(Error, Debug)]
pub enum CutXError {
    /// A time range that is negative, non-finite or reversed
    #[error("Invalid time range: {message}")]
    InvalidRange { message: String },

    /// Request rejected before any transcode subprocess is spawned
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Duration or size query failed
    #[error("Failed to probe media file: {message}")]
    Probe { message: String },

    /// External transcoder failed to spawn or exited non-zero
    #[error("Transcode failed: {message}")]
    Transcode { message: String },

    /// Another cut is already writing to the same output file
    #[error("A cut targeting {path} is already running")]
    JobInFlight { path: String },

    /// Invalid configuration value or unreadable config file
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CutXError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transcode(message: impl Into<String>) -> Self {
        Self::Transcode {
            message: message.into(),
        }
    }

    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    /// Whether a single-pass attempt that failed this way may be retried
    /// with the per-segment strategy.
    pub fn is_transcode(&self) -> bool {
        matches!(self, Self::Transcode { .. })
    }
}

/// Result type alias for CutX operations
pub type CutXResult<T> = std::result::Result<T, CutXError>;
