//! Core cutting engine module

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::events::{ProgressEvent, ProgressHub};

pub mod fallback;
pub mod filter_graph;
pub mod progress;
pub mod transcode;

use progress::PercentTracker;

/// Encoder settings shared by both strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Video codec for mp4 output
    pub video_codec: String,
    /// Encoding preset
    pub preset: String,
    /// CRF quality setting
    pub crf: u8,
    /// Audio codec for mp4 output
    pub audio_codec: String,
    /// Audio bitrate of single-pass mp4 output
    pub audio_bitrate: String,
    /// Audio bitrate of fallback mp4 parts
    pub part_audio_bitrate: String,
    /// Codec for mp3 output
    pub mp3_codec: String,
    /// VBR quality for mp3 output
    pub mp3_quality: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            part_audio_bitrate: "128k".to_string(),
            mp3_codec: "libmp3lame".to_string(),
            mp3_quality: 2,
        }
    }
}

impl EncodingConfig {
    /// Codec arguments for mp4 output with the given audio bitrate
    pub(crate) fn mp4_args(&self, audio_bitrate: &str) -> Vec<String> {
        vec![
            "-c:v".into(),
            self.video_codec.clone(),
            "-preset".into(),
            self.preset.clone(),
            "-crf".into(),
            self.crf.to_string(),
            "-c:a".into(),
            self.audio_codec.clone(),
            "-b:a".into(),
            audio_bitrate.to_string(),
        ]
    }

    /// Codec arguments for mp3 output, video dropped
    pub(crate) fn mp3_args(&self) -> Vec<String> {
        vec![
            "-vn".into(),
            "-c:a".into(),
            self.mp3_codec.clone(),
            "-q:a".into(),
            self.mp3_quality.to_string(),
        ]
    }
}

/// Emits the lifecycle events of one job onto the hub.
///
/// Keeps a single percent tracker for the whole job so that escalating from
/// one strategy to the other never makes the reported percent go back.
pub struct JobReporter {
    hub: ProgressHub,
    job_id: String,
    tracker: PercentTracker,
}

impl JobReporter {
    pub fn new(hub: ProgressHub, job_id: impl Into<String>) -> Self {
        Self {
            hub,
            job_id: job_id.into(),
            tracker: PercentTracker::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn percent(&self) -> u8 {
        self.tracker.last()
    }

    pub fn start(&mut self, segments: usize) {
        info!(job = %self.job_id, segments, "Cut started");
        self.hub.broadcast(ProgressEvent::Start { total: segments });
    }

    /// Seconds of output written by a single-pass run
    pub fn elapsed(&mut self, current: f64, total: f64) {
        let percent = self.tracker.observe(current, total);
        self.hub.broadcast(ProgressEvent::Progress {
            current,
            total,
            percent,
        });
    }

    /// A fallback part finished
    pub fn part_done(&mut self, done: usize, total: usize) {
        let percent = self.tracker.observe(done as f64, total as f64);
        debug!(job = %self.job_id, done, total, percent, "Part finished");
        self.hub.broadcast(ProgressEvent::Progress {
            current: done as f64,
            total: total as f64,
            percent,
        });
    }

    pub fn merge(&mut self) {
        info!(job = %self.job_id, "Merging parts");
        self.hub.broadcast(ProgressEvent::Merge);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(job = %self.job_id, "{}", message);
        self.hub.broadcast(ProgressEvent::info(message));
    }

    pub fn complete(&mut self, output: PathBuf, size: u64, duration: f64) {
        info!(job = %self.job_id, output = %output.display(), size, duration, "Cut complete");
        self.hub.broadcast(ProgressEvent::Complete {
            output,
            size,
            duration,
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(job = %self.job_id, "Cut failed: {}", message);
        self.hub.broadcast(ProgressEvent::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encoding_args() {
        let enc = EncodingConfig::default();
        assert_eq!(
            enc.mp4_args(&enc.audio_bitrate).join(" "),
            "-c:v libx264 -preset fast -crf 18 -c:a aac -b:a 192k"
        );
        assert_eq!(enc.mp3_args().join(" "), "-vn -c:a libmp3lame -q:a 2");
    }

    #[test]
    fn test_encoding_config_partial_toml() {
        let enc: EncodingConfig = toml::from_str("crf = 23\npreset = \"slow\"").unwrap();
        assert_eq!(enc.crf, 23);
        assert_eq!(enc.preset, "slow");
        assert_eq!(enc.audio_bitrate, "192k");
    }

    #[test]
    fn test_reporter_percent_survives_strategy_switch() {
        let hub = ProgressHub::default();
        let mut sub = hub.subscribe();
        let mut reporter = JobReporter::new(hub.clone(), "job-1");

        reporter.start(3);
        reporter.elapsed(6.0, 10.0);
        // fallback restarts counting parts from zero
        reporter.part_done(1, 3);
        reporter.part_done(3, 3);

        let percents: Vec<u8> = sub
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![60, 60, 99]);
    }
}
