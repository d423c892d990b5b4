//! CutX segment-cut engine
//!
//! Turns a list of time ranges to delete into a media file containing only
//! what remains, driving `ffmpeg` either through one filter graph or piece
//! by piece, and broadcasting progress to any number of live observers.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod planner;
pub mod ports;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use app::{CutOrchestrator, CutOutcome, CutRequest, JobAccepted};
pub use config::AppConfig;
pub use domain::model::{DeleteRequest, ExecutionStrategy, KeepPlan, OutputFormat, TimeRange};
pub use error::{CutXError, CutXResult};
pub use events::{ProgressEvent, ProgressHub};
pub use planner::{CutPlan, CutPlanner};
