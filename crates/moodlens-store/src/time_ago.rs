//! Human-readable relative ages ("Just now", "3 minutes ago", ...).

use chrono::{DateTime, Utc};

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3_600.0;
const DAY: f64 = 86_400.0;

/// Render `now - then` with fixed breakpoints. Counts are truncated, and
/// timestamps in the future render as "Just now".
pub fn time_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_milliseconds() as f64 / 1000.0;

    if seconds < MINUTE {
        return "Just now".to_string();
    }

    let (count, unit) = if seconds < HOUR {
        ((seconds / MINUTE) as i64, "minute")
    } else if seconds < DAY {
        ((seconds / HOUR) as i64, "hour")
    } else {
        ((seconds / DAY) as i64, "day")
    };

    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}
