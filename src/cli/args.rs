//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::model::{OutputFormat, TimeRange};

/// Planning knobs shared by `cut` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct PlanningArgs {
    /// Segment to delete as START-END (seconds, MM:SS.ms or HH:MM:SS.ms); repeatable
    #[arg(short, long = "delete", value_name = "START-END")]
    pub deletes: Vec<TimeRange>,

    /// JSON file with a delete list ([{"start": s, "end": e}, ...])
    #[arg(long, value_name = "FILE")]
    pub segments: Option<PathBuf>,

    /// Padding added around each delete range, in milliseconds
    #[arg(long)]
    pub buffer_ms: Option<i64>,

    /// Keep-range count above which parts are cut individually
    #[arg(long)]
    pub max_segments: Option<usize>,
}

impl PlanningArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(buffer_ms) = self.buffer_ms {
            config.cut.buffer_ms = buffer_ms;
        }
        if let Some(max_segments) = self.max_segments {
            config.cut.max_segments = max_segments;
        }
    }
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Media file cut by requests that do not name one
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    pub addr: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(addr) = &self.addr {
            config.server.addr = addr.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Input media file
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub planning: PlanningArgs,

    /// Output format
    #[arg(short, long, default_value = "mp4")]
    pub format: OutputFormat,

    /// Directory for the output (default: next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Audio crossfade at each join, in milliseconds
    #[arg(long)]
    pub crossfade_ms: Option<i64>,

    /// Constant Rate Factor (0-51)
    #[arg(long)]
    pub crf: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Print progress events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Also print informational events
    #[arg(short, long)]
    pub verbose: bool,
}

impl CutArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        self.planning.apply(config);
        if let Some(dir) = &self.output_dir {
            config.cut.output_dir = Some(dir.clone());
        }
        if let Some(crossfade_ms) = self.crossfade_ms {
            config.cut.crossfade_ms = crossfade_ms;
        }
        if let Some(crf) = self.crf {
            config.encoding.crf = crf;
        }
        if let Some(preset) = &self.preset {
            config.encoding.preset = preset.clone();
        }
    }
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Media duration (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub duration: Option<String>,

    /// Probe the duration of this file instead
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub planning: PlanningArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}
