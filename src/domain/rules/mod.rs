// Domain rules - Turning delete ranges into a keep plan

use crate::domain::model::*;

/// Default symmetric widening applied to each delete range (breath sounds,
/// residual phonemes at the cut edges)
pub const DEFAULT_BUFFER_SECS: f64 = 0.05;

/// Shortest keep range ever emitted. Times are handed to ffmpeg with
/// millisecond precision, so anything shorter could round to an empty trim.
pub const MIN_KEEP_SECS: f64 = 0.002;

/// Normalizes raw delete ranges into the minimal ordered keep plan
#[derive(Debug, Clone, Copy)]
pub struct IntervalMerger {
    buffer: f64,
    min_keep: f64,
}

impl Default for IntervalMerger {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SECS)
    }
}

impl IntervalMerger {
    /// Create a merger with the given buffer in seconds (negative values are treated as zero)
    pub fn new(buffer: f64) -> Self {
        Self {
            buffer: buffer.max(0.0),
            min_keep: MIN_KEEP_SECS,
        }
    }

    /// Drop keep ranges shorter than `secs` (never below `MIN_KEEP_SECS`)
    pub fn with_min_keep(mut self, secs: f64) -> Self {
        self.min_keep = secs.max(MIN_KEEP_SECS);
        self
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    pub fn min_keep(&self) -> f64 {
        self.min_keep
    }

    /// Expand, sort and merge the delete ranges against `[0, duration]`.
    ///
    /// Ranges that end up entirely outside the media are discarded. A range
    /// whose start is at or before the current merged end extends it, so
    /// touching ranges collapse into one.
    pub fn merge_deletes(&self, deletes: &[TimeRange], duration: f64) -> Vec<TimeRange> {
        let mut expanded: Vec<(f64, f64)> = deletes
            .iter()
            .map(|d| {
                (
                    (d.start() - self.buffer).max(0.0),
                    (d.end() + self.buffer).min(duration),
                )
            })
            .filter(|(start, end)| end > start)
            .collect();

        // Vec::sort_by is stable, equal starts keep caller order
        expanded.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(expanded.len());
        for (start, end) in expanded {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        merged
            .into_iter()
            .map(|(start, end)| TimeRange::from_bounds(start, end))
            .collect()
    }

    /// Invert already merged deletes into keep ranges; keeps shorter than
    /// `min_keep` are dropped along with the zero-length ones
    pub fn invert(&self, merged: &[TimeRange], duration: f64) -> KeepPlan {
        let mut keep = Vec::with_capacity(merged.len() + 1);
        let mut cursor = 0.0_f64;

        for delete in merged {
            if delete.start() - cursor >= self.min_keep {
                keep.push(TimeRange::from_bounds(cursor, delete.start()));
            }
            cursor = cursor.max(delete.end());
        }
        if duration - cursor >= self.min_keep {
            keep.push(TimeRange::from_bounds(cursor, duration));
        }

        KeepPlan::from_sorted(keep)
    }

    /// Full pipeline: delete request + media duration -> keep plan
    pub fn keep_plan(&self, deletes: &[TimeRange], duration: f64) -> KeepPlan {
        let merged = self.merge_deletes(deletes, duration);
        self.invert(&merged, duration)
    }
}
