// Domain models - Core types and data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CutXError, CutXResult};
use crate::utils::time::{format_timestamp, parse_timestamp};

/// Half-open time interval `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct RawRange {
    start: f64,
    end: f64,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = CutXError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Create a validated range: finite, `start >= 0`, `end > start`
    pub fn new(start: f64, end: f64) -> CutXResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(CutXError::InvalidRange {
                message: format!("bounds must be finite (got {} - {})", start, end),
            });
        }
        if start < 0.0 {
            return Err(CutXError::InvalidRange {
                message: format!("start cannot be negative (got {})", start),
            });
        }
        if end <= start {
            return Err(CutXError::InvalidRange {
                message: format!("end ({}) must be greater than start ({})", end, start),
            });
        }
        Ok(Self { start, end })
    }

    /// Internal constructor for ranges the merger already proved non-empty
    pub(crate) fn from_bounds(start: f64, end: f64) -> Self {
        debug_assert!(end > start);
        Self { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

impl FromStr for TimeRange {
    type Err = CutXError;

    /// Parse `START-END`, each side in any format `parse_timestamp` accepts
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or_else(|| CutXError::InvalidRange {
            message: format!("expected START-END, got '{}'", s),
        })?;
        TimeRange::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }
}

/// Caller-supplied delete ranges; may overlap, be unsorted or exceed the media
pub type DeleteRequest = Vec<TimeRange>;

/// Ordered, non-overlapping ranges of the source that survive the cut
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeepPlan {
    ranges: Vec<TimeRange>,
}

impl KeepPlan {
    pub(crate) fn from_sorted(ranges: Vec<TimeRange>) -> Self {
        debug_assert!(ranges.windows(2).all(|w| w[0].end <= w[1].start));
        Self { ranges }
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Length of the output timeline
    pub fn total_duration(&self) -> f64 {
        self.ranges.iter().map(TimeRange::duration).sum()
    }

    /// Ranges of `[0, duration)` not covered by this plan
    pub fn complement(&self, duration: f64) -> Vec<TimeRange> {
        let mut gaps = Vec::with_capacity(self.ranges.len() + 1);
        let mut cursor = 0.0;
        for keep in &self.ranges {
            if keep.start > cursor {
                gaps.push(TimeRange::from_bounds(cursor, keep.start));
            }
            cursor = keep.end;
        }
        if cursor < duration {
            gaps.push(TimeRange::from_bounds(cursor, duration));
        }
        gaps
    }
}

/// Output container selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Audio + video, H.264/AAC in MP4
    #[default]
    Mp4,
    /// Audio only, MP3
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mp3 => "mp3",
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, OutputFormat::Mp3)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = CutXError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "mp3" => Ok(OutputFormat::Mp3),
            other => Err(CutXError::validation(format!(
                "unsupported output format '{}': expected mp4 or mp3",
                other
            ))),
        }
    }
}

/// How a keep plan is realized by the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// One ffmpeg invocation with a trim/concat/crossfade filter graph
    SinglePass,
    /// One invocation per keep range, then a stream-copy concat
    Fallback,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::SinglePass => f.write_str("SinglePass"),
            ExecutionStrategy::Fallback => f.write_str("Fallback"),
        }
    }
}

#[cfg(test)]
mod tests;
