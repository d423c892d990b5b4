//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

/// Format a byte count for display
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}

/// Integer percentage of `current` over `total`, capped below completion.
///
/// Only a terminal event may report 100.
pub fn running_percent(current: f64, total: f64) -> u8 {
    if !(total > 0.0) || !current.is_finite() {
        return 0;
    }
    ((current / total) * 100.0).round().clamp(0.0, 99.0) as u8
}
