//! FFprobe adapter for media duration queries

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CutXError, CutXResult};
use crate::ports::ProbePort;
use crate::utils::path::ffmpeg_file_arg;

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl Default for FfprobeAdapter {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn probe_blocking(binary: &Path, path: &Path) -> CutXResult<f64> {
        let output = Command::new(binary)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(ffmpeg_file_arg(path))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                CutXError::probe(format!("failed to start {}: {}", binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(CutXError::probe(format!(
                "{} exited with {} for {}: {}",
                binary.display(),
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse ffprobe's `format=duration` csv output
pub fn parse_duration(stdout: &str) -> CutXResult<f64> {
    let text = stdout.trim();
    let duration: f64 = text
        .parse()
        .map_err(|_| CutXError::probe(format!("unexpected duration output '{}'", text)))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(CutXError::probe(format!("invalid duration {}", duration)));
    }
    Ok(duration)
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_duration(&self, path: &Path) -> CutXResult<f64> {
        let binary = self.binary.clone();
        let target = path.to_path_buf();
        let duration = tokio::task::spawn_blocking(move || Self::probe_blocking(&binary, &target))
            .await
            .map_err(|e| CutXError::probe(format!("probe task failed: {}", e)))??;
        debug!(path = %path.display(), duration, "Probed duration");
        Ok(duration)
    }
}
