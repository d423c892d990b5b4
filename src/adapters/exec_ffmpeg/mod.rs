//! FFmpeg execution adapter
//!
//! Runs the ffmpeg binary as a child process and streams its stderr.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::engine::progress::LineSplitter;
use crate::error::{CutXError, CutXResult};
use crate::ports::{Invocation, TranscodePort};

/// Number of stderr lines kept for error reports
pub const STDERR_TAIL_LINES: usize = 20;

/// Last lines ffmpeg wrote, oldest first
#[derive(Debug)]
struct StderrTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StderrTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn joined(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// FFmpeg-based transcode adapter
#[derive(Debug, Clone)]
pub struct FfmpegAdapter {
    binary: PathBuf,
}

impl Default for FfmpegAdapter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl TranscodePort for FfmpegAdapter {
    async fn run(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
    ) -> CutXResult<()> {
        let mut child = Command::new(&self.binary)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CutXError::transcode(format!(
                    "failed to start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;
        debug!(pid = ?child.id(), output = %invocation.output.display(), "ffmpeg started");

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CutXError::transcode("ffmpeg stderr was not captured"))?;

        let mut splitter = LineSplitter::new();
        let mut tail = StderrTail::new(STDERR_TAIL_LINES);
        let mut buf = [0u8; 8192];
        loop {
            let n = stderr
                .read(&mut buf)
                .await
                .map_err(|e| CutXError::transcode(format!("reading ffmpeg output: {}", e)))?;
            if n == 0 {
                break;
            }
            for line in splitter.push(&buf[..n]) {
                on_line(&line);
                tail.push(line);
            }
        }
        if let Some(line) = splitter.finish() {
            on_line(&line);
            tail.push(line);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CutXError::transcode(format!("waiting for ffmpeg: {}", e)))?;
        if !status.success() {
            return Err(CutXError::transcode(format!(
                "ffmpeg exited with {}\n{}",
                status,
                tail.joined()
            )));
        }
        Ok(())
    }
}
