//! Transcoder runs with progress reporting

use std::path::Path;

use tracing::{debug, trace};

use crate::domain::model::{KeepPlan, OutputFormat};
use crate::error::CutXResult;
use crate::ports::{Invocation, TranscodePort};

use super::filter_graph::FilterGraphBuilder;
use super::progress::parse_progress_line;
use super::{EncodingConfig, JobReporter};

/// Run `invocation`, turning each `time=` marker into a progress event
/// measured against `total` seconds of output.
pub async fn run_tracked(
    transcoder: &dyn TranscodePort,
    invocation: &Invocation,
    reporter: &mut JobReporter,
    total: f64,
) -> CutXResult<()> {
    debug!(job = %reporter.job_id(), args = %invocation, "Running ffmpeg");
    let mut on_line = |line: &str| {
        trace!("ffmpeg: {}", line);
        if let Some(elapsed) = parse_progress_line(line).and_then(|m| m.elapsed) {
            reporter.elapsed(elapsed, total);
        }
    };
    transcoder.run(invocation, &mut on_line).await
}

/// Cuts the whole plan with one filter-graph transcode
pub struct SinglePassCutter<'a> {
    transcoder: &'a dyn TranscodePort,
    graph: FilterGraphBuilder,
    encoding: &'a EncodingConfig,
}

impl<'a> SinglePassCutter<'a> {
    pub fn new(
        transcoder: &'a dyn TranscodePort,
        graph: FilterGraphBuilder,
        encoding: &'a EncodingConfig,
    ) -> Self {
        Self {
            transcoder,
            graph,
            encoding,
        }
    }

    pub async fn cut(
        &self,
        source: &Path,
        output: &Path,
        plan: &KeepPlan,
        format: OutputFormat,
        reporter: &mut JobReporter,
    ) -> CutXResult<()> {
        let invocation = self
            .graph
            .invocation(source, output, plan, format, self.encoding);
        run_tracked(self.transcoder, &invocation, reporter, plan.total_duration()).await
    }
}
