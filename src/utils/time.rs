//! Time parsing and formatting utilities

use crate::error::{CutXError, CutXResult};

/// Parse a timestamp given as plain seconds, `MM:SS.ms` or `H:MM:SS.ms`.
///
/// The same grammar covers operator input on the command line and the
/// `time=` marker ffmpeg writes to its status line.
pub fn parse_timestamp(text: &str) -> CutXResult<f64> {
    let text = text.trim();
    let invalid = || CutXError::InvalidRange {
        message: format!(
            "invalid time '{}': expected seconds, MM:SS.ms or HH:MM:SS.ms",
            text
        ),
    };

    let parts: Vec<&str> = text.split(':').collect();
    let seconds = match parts.as_slice() {
        [secs] => secs.parse::<f64>().map_err(|_| invalid())?,
        [mins, secs] => {
            let minutes: u32 = mins.parse().map_err(|_| invalid())?;
            let seconds: f64 = secs.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            minutes as f64 * 60.0 + seconds
        }
        [hours, mins, secs] => {
            let hours: u32 = hours.parse().map_err(|_| invalid())?;
            let minutes: u32 = mins.parse().map_err(|_| invalid())?;
            let seconds: f64 = secs.parse().map_err(|_| invalid())?;
            if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
        }
        _ => return Err(invalid()),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }
    Ok(seconds)
}

/// Format seconds as `HH:MM:SS.mmm` (hours omitted when zero)
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}
