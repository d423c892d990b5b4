//! Single-pass filter graph construction

use std::fmt;
use std::path::Path;

use crate::domain::model::{KeepPlan, OutputFormat};
use crate::ports::Invocation;
use crate::utils::path::ffmpeg_file_arg;

use super::EncodingConfig;

/// Default audio crossfade at each join, in seconds
pub const DEFAULT_CROSSFADE_SECS: f64 = 0.030;

/// A `-filter_complex` graph with its output labels
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    statements: Vec<String>,
    has_video: bool,
}

impl FilterGraph {
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// `-map` arguments selecting the graph outputs
    pub fn map_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if self.has_video {
            args.extend(["-map".to_string(), "[outv]".to_string()]);
        }
        args.extend(["-map".to_string(), "[outa]".to_string()]);
        args
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statements.join(";"))
    }
}

/// Builds one graph that trims every keep range and joins them.
///
/// Video is concatenated; audio is chained through short crossfades so
/// joins do not click.
#[derive(Debug, Clone, Copy)]
pub struct FilterGraphBuilder {
    crossfade: f64,
}

impl Default for FilterGraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CROSSFADE_SECS)
    }
}

impl FilterGraphBuilder {
    pub fn new(crossfade_secs: f64) -> Self {
        Self {
            crossfade: crossfade_secs.max(0.0),
        }
    }

    pub fn build(&self, plan: &KeepPlan, format: OutputFormat) -> FilterGraph {
        let has_video = !format.is_audio_only();
        let ranges = plan.ranges();
        let mut statements = Vec::with_capacity(ranges.len() * 2 + ranges.len());

        for (i, range) in ranges.iter().enumerate() {
            if has_video {
                statements.push(format!(
                    "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS[v{}]",
                    range.start(),
                    range.end(),
                    i
                ));
            }
            statements.push(format!(
                "[0:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS[a{}]",
                range.start(),
                range.end(),
                i
            ));
        }

        if has_video {
            let inputs: String = (0..ranges.len()).map(|i| format!("[v{}]", i)).collect();
            statements.push(format!("{}concat=n={}:v=1:a=0[outv]", inputs, ranges.len()));
        }

        if ranges.len() == 1 {
            statements.push("[a0]anull[outa]".to_string());
        } else {
            let mut current = "a0".to_string();
            for i in 1..ranges.len() {
                let out = if i == ranges.len() - 1 {
                    "outa".to_string()
                } else {
                    format!("amid{}", i)
                };
                statements.push(format!(
                    "[{}][a{}]acrossfade=d={:.3}:c1=tri:c2=tri[{}]",
                    current, i, self.crossfade, out
                ));
                current = out;
            }
        }

        FilterGraph {
            statements,
            has_video,
        }
    }

    /// Full ffmpeg argument list for a single-pass cut
    pub fn invocation(
        &self,
        source: &Path,
        output: &Path,
        plan: &KeepPlan,
        format: OutputFormat,
        encoding: &EncodingConfig,
    ) -> Invocation {
        let graph = self.build(plan, format);
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            ffmpeg_file_arg(source),
            "-filter_complex".to_string(),
            graph.to_string(),
        ];
        args.extend(graph.map_args());
        match format {
            OutputFormat::Mp4 => args.extend(encoding.mp4_args(&encoding.audio_bitrate)),
            OutputFormat::Mp3 => args.extend(encoding.mp3_args()),
        }
        args.push(ffmpeg_file_arg(output));
        Invocation::new(args, output)
    }
}
