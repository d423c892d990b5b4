//! Job lifecycle events and their fan-out to live observers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod console;
pub mod hub;

pub use console::ConsoleReporter;
pub use hub::{EventSink, ProgressHub, SinkClosed, SubscriberId, Subscription};

/// One broadcast message describing cut progress.
///
/// Serialized as `{"type": "<kind>", ...}`, the shape SSE clients consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Sent once to each new subscriber
    Connected,
    /// A job started; `total` is the number of keep ranges
    Start { total: usize },
    /// Seconds of output written (single pass) or parts cut (fallback)
    Progress { current: f64, total: f64, percent: u8 },
    /// All parts are cut, concatenation is running
    Merge,
    /// Terminal success
    Complete {
        output: PathBuf,
        /// Output size in bytes
        size: u64,
        /// Probed output duration in seconds
        duration: f64,
    },
    /// Terminal failure
    Error { message: String },
    /// Free-form lifecycle note
    Info { message: String },
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Complete and Error end a job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
