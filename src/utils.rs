//! Small helpers.

use std::time::Duration;

/// Render a duration compactly, largest unit first: `1h2m3.5s`, `4m0s`,
/// `12.25s`, `350ms`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        return format!("{}ms", total_ms);
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let millis = total_ms % 60_000;
    let seconds = format_seconds(millis);

    if hours > 0 {
        format!("{}h{}m{}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}", minutes, seconds)
    } else {
        seconds
    }
}

fn format_seconds(millis: u128) -> String {
    let whole = millis / 1000;
    let frac = millis % 1000;
    if frac == 0 {
        format!("{}s", whole)
    } else {
        let frac = format!("{:03}", frac);
        format!("{}.{}s", whole, frac.trim_end_matches('0'))
    }
}
