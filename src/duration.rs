use std::sync::LazyLock;

use regex::Regex;

/// Matches the time part of an ISO 8601 duration, eg. `PT1H2M3S`.
///
/// Only the start is anchored: anything after the seconds component is ignored.
pub static ISO8601_DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").unwrap());

/// Placeholder used when a video has no usable duration
pub const UNKNOWN_DURATION: &str = "N/A";

/// Formats an ISO 8601 duration (eg. `PT2M34S`) as a clock string.
///
/// Returns `H:MM:SS` when the duration has hours, `MM:SS` otherwise and
/// [`UNKNOWN_DURATION`] when the input is empty or does not look like a duration.
#[must_use]
pub fn format_iso8601_duration(duration: Option<&str>) -> String {
    let Some(duration) = duration.filter(|d| !d.is_empty()) else {
        return UNKNOWN_DURATION.to_string();
    };
    let Some(captures) = ISO8601_DURATION_REGEX.captures(duration) else {
        return UNKNOWN_DURATION.to_string();
    };

    let component = |idx: usize| -> Option<u64> {
        captures.get(idx).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let (Some(hours), Some(minutes), Some(seconds)) = (component(1), component(2), component(3))
    else {
        return UNKNOWN_DURATION.to_string();
    };

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
