//! Unit formatting for message templates.
//!
//! | Function | Input | Example |
//! |----------|-------|---------|
//! | [`duration`] | seconds | `3661` → `01:01:01` |
//! | [`length`] | millimetres | `1500` → `1.5m` |
//! | [`size`] | bytes | `300000` → `0.3MB` |

// ============================================================================
// Constants
// ============================================================================

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// A unit is used once the value in it exceeds this.
const LENGTH_UNIT_THRESHOLD: f64 = 0.75;

/// Sizes from this many megabytes up are shown in MB.
const MEGABYTE_THRESHOLD: f64 = 0.25;

// ============================================================================
// Formatting
// ============================================================================

/// Formats seconds as `D:HH:MM:SS`, `HH:MM:SS`, `MM:SS` or `00:SS`.
///
/// Leading zero units are dropped from the left; minutes and seconds are
/// always shown.
#[must_use]
pub fn duration(total_secs: u64) -> String {
    let days = total_secs / SECS_PER_DAY;
    let hours = total_secs % SECS_PER_DAY / SECS_PER_HOUR;
    let mins = total_secs % SECS_PER_HOUR / SECS_PER_MINUTE;
    let secs = total_secs % SECS_PER_MINUTE;

    if days > 0 {
        format!("{days}:{hours:02}:{mins:02}:{secs:02}")
    } else if hours > 0 {
        format!("{hours:02}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Formats millimetres in the largest of `m`, `dm`, `cm` whose value
/// exceeds 0.75, rounded to two decimals; smaller lengths stay in `mm`.
#[must_use]
pub fn length(millis: u64) -> String {
    let centis = millis as f64 / 10.0;
    let decis = centis / 10.0;
    let metres = decis / 10.0;

    if metres > LENGTH_UNIT_THRESHOLD {
        format!("{}m", decimal(metres, 2))
    } else if decis > LENGTH_UNIT_THRESHOLD {
        format!("{}dm", decimal(decis, 2))
    } else if centis > LENGTH_UNIT_THRESHOLD {
        format!("{}cm", decimal(centis, 2))
    } else {
        format!("{millis}mm")
    }
}

/// Formats bytes as `MB` (one decimal, from 0.25 MB), whole `KB`, or `B`.
#[must_use]
pub fn size(bytes: u64) -> String {
    let kilos = bytes / 1024;
    let megas = kilos as f64 / 1024.0;

    if megas >= MEGABYTE_THRESHOLD {
        format!("{}MB", decimal(megas, 1))
    } else if kilos > 0 {
        format!("{kilos}KB")
    } else {
        format!("{bytes}B")
    }
}

/// Rounds half up to `places` decimals and drops trailing zeros, keeping at
/// least one digit after the point.
fn decimal(value: f64, places: usize) -> String {
    let scale = 10f64.powi(places as i32);
    let value = (value * scale).round() / scale;
    let rounded = format!("{value:.places$}");
    let trimmed = rounded.trim_end_matches('0');

    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
