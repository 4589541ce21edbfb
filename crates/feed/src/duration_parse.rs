// ABOUTME: Duration string parsing for enclosure lengths and refresh intervals.
// ABOUTME: Supports (fractional) seconds, HH:MM:SS, MM:SS, and Go-style duration strings.

use std::time::Duration;

/// Parses a media duration.
/// Supports:
/// - Plain seconds, optionally fractional ("90", "12.5")
/// - HH:MM:SS and MM:SS, with optional fractional seconds
/// - Go-style durations like "1h30m", "45m", "2h"
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(secs) = parse_seconds(s) {
        return Some(secs);
    }

    if s.contains(':') {
        return parse_colon_format(s);
    }

    parse_duration::parse(s).ok()
}

/// Whole seconds of a duration string, fractions truncated.
pub fn parse_duration_seconds(s: &str) -> Option<u64> {
    parse_duration(s).map(|d| d.as_secs())
}

fn parse_seconds(s: &str) -> Option<Duration> {
    if !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let secs: f64 = s.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_colon_format(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.split(':').collect();

    let (hours, mins, secs) = match parts.as_slice() {
        [m, s] => (0, m.parse::<u64>().ok()?, parse_seconds(s)?),
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, parse_seconds(s)?),
        _ => return None,
    };
    // out-of-range values leave the duration unknown
    let whole = hours.checked_mul(3600)?.checked_add(mins.checked_mul(60)?)?;
    Duration::from_secs(whole).checked_add(secs)
}
