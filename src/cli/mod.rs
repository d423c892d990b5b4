//! CLI module for CutX
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// CutX segment cutter
///
/// Removes marked time ranges from a media file with ffmpeg and reports
/// progress live.
#[derive(Parser, Debug)]
#[command(name = "cutx")]
#[command(about = "CutX - remove marked segments from audio and video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "CUTX_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (default: ./cutx.toml when present)
    #[arg(long, env = "CUTX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (cut submission, SSE progress, status)
    Serve(args::ServeArgs),
    /// Cut segments out of a file in the foreground
    Cut(args::CutArgs),
    /// Show the keep plan and strategy without transcoding
    Plan(args::PlanArgs),
}
