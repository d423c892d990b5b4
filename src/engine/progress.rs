//! Progress extraction from ffmpeg's stderr status line

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::running_percent;
use crate::utils::time::parse_timestamp;

/// Markers found on one ffmpeg status line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressMarker {
    pub frame: Option<u64>,
    /// Seconds of output written so far
    pub elapsed: Option<f64>,
    pub size_kb: Option<u64>,
}

fn frame_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"frame=\s*(\d+)").expect("valid frame regex"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"time=\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").expect("valid time regex"))
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"size=\s*(\d+)\s*[kK]i?B").expect("valid size regex"))
}

/// Parse the markers on a status line; `None` when the line carries none
pub fn parse_progress_line(line: &str) -> Option<ProgressMarker> {
    let frame = frame_re()
        .captures(line)
        .and_then(|c| c[1].parse::<u64>().ok());
    let elapsed = time_re()
        .captures(line)
        .and_then(|c| parse_timestamp(&c[1]).ok());
    let size_kb = size_re()
        .captures(line)
        .and_then(|c| c[1].parse::<u64>().ok());

    if frame.is_none() && elapsed.is_none() && size_kb.is_none() {
        return None;
    }
    Some(ProgressMarker {
        frame,
        elapsed,
        size_kb,
    })
}

/// Percent that never goes backwards and stays below 100 until completion
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentTracker {
    last: u8,
}

impl PercentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, current: f64, total: f64) -> u8 {
        self.last = self.last.max(running_percent(current, total));
        self.last
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

/// Splits a byte stream into lines on both `\r` and `\n`.
///
/// ffmpeg redraws its status line with bare carriage returns, so splitting
/// on newlines alone would surface progress only once at exit.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                self.flush_into(&mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Trailing text not terminated by a line break
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.flush_into(&mut lines);
        lines.pop()
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}
