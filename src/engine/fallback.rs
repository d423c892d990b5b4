//! Per-segment cutting followed by a stream-copy concat

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, trace, warn};

use crate::domain::model::{KeepPlan, OutputFormat, TimeRange};
use crate::error::CutXResult;
use crate::ports::{Invocation, TranscodePort};
use crate::utils::path::{absolutize, ffmpeg_file_arg};

use super::{EncodingConfig, JobReporter};

/// Prefix of the scratch directory holding the parts
pub const PARTS_DIR_PREFIX: &str = "cutx_parts_";
/// Concat demuxer manifest name inside the parts directory
pub const MANIFEST_NAME: &str = "list.txt";

/// Cuts each keep range into its own file, then joins them.
///
/// Parts live in a fresh temporary directory that is removed when the
/// cutter returns or its future is dropped.
pub struct FallbackCutter<'a> {
    transcoder: &'a dyn TranscodePort,
    encoding: &'a EncodingConfig,
    work_dir: Option<&'a Path>,
}

impl<'a> FallbackCutter<'a> {
    pub fn new(
        transcoder: &'a dyn TranscodePort,
        encoding: &'a EncodingConfig,
        work_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            transcoder,
            encoding,
            work_dir,
        }
    }

    fn parts_dir(&self) -> CutXResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PARTS_DIR_PREFIX);
        let dir = match self.work_dir {
            Some(work_dir) => {
                let work_dir = absolutize(work_dir)?;
                std::fs::create_dir_all(&work_dir)?;
                builder.tempdir_in(work_dir)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    pub async fn cut(
        &self,
        source: &Path,
        output: &Path,
        plan: &KeepPlan,
        format: OutputFormat,
        reporter: &mut JobReporter,
    ) -> CutXResult<()> {
        let parts_dir = self.parts_dir()?;
        let total = plan.len();
        info!(
            job = %reporter.job_id(),
            parts = total,
            dir = %parts_dir.path().display(),
            "Cutting segments individually"
        );

        let mut parts = Vec::with_capacity(total);
        for (i, range) in plan.ranges().iter().enumerate() {
            let part = parts_dir
                .path()
                .join(format!("part{:04}.{}", i, format.extension()));
            let invocation = self.part_invocation(source, &part, range, format);
            debug!(job = %reporter.job_id(), part = i, %range, "Cutting part");
            self.transcoder
                .run(&invocation, &mut |line: &str| trace!("ffmpeg: {}", line))
                .await?;
            parts.push(part);
            reporter.part_done(i + 1, total);
        }

        reporter.merge();
        let manifest = parts_dir.path().join(MANIFEST_NAME);
        tokio::fs::write(&manifest, concat_manifest(&parts)).await?;
        self.transcoder
            .run(
                &concat_invocation(&manifest, output),
                &mut |line: &str| trace!("ffmpeg: {}", line),
            )
            .await?;

        if let Err(e) = parts_dir.close() {
            warn!("Failed to remove parts directory: {}", e);
        }
        Ok(())
    }

    fn part_invocation(
        &self,
        source: &Path,
        part: &Path,
        range: &TimeRange,
        format: OutputFormat,
    ) -> Invocation {
        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", range.start()),
            "-i".to_string(),
            ffmpeg_file_arg(source),
            "-t".to_string(),
            format!("{:.3}", range.duration()),
        ];
        match format {
            OutputFormat::Mp4 => args.extend(self.encoding.mp4_args(&self.encoding.part_audio_bitrate)),
            OutputFormat::Mp3 => args.extend(self.encoding.mp3_args()),
        }
        args.extend([
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
            part.display().to_string(),
        ]);
        Invocation::new(args, part)
    }
}

/// Concat demuxer manifest: one quoted absolute path per line
pub fn concat_manifest(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|part| {
            let escaped = part.display().to_string().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

fn concat_invocation(manifest: &Path, output: &Path) -> Invocation {
    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        ffmpeg_file_arg(output),
    ];
    Invocation::new(args, output)
}
