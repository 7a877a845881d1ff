use std::sync::LazyLock;

use regex::Regex;

/// Durations offered when creating a task, in seconds
pub const PRESETS: &[u64] = &[
    60, 180, 300, 600, 900, 1200, 1500, 1800, 3600, 7200, 10800, 14400,
];

/// The next preset above (`up`) or below `seconds`, or `None` past either end.
pub fn step_preset(seconds: u64, up: bool) -> Option<u64> {
    if up {
        PRESETS.iter().copied().find(|&p| p > seconds)
    } else {
        PRESETS.iter().rev().copied().find(|&p| p < seconds)
    }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?$").expect("valid duration regex")
});

/// Parse `90`, `90s`, `25m`, `1h`, `1h30m`, `1h30m15s` into seconds.
/// `None` for anything else, including totals that overflow.
pub fn parse_duration(input: &str) -> Option<u64> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }
    let caps = DURATION_RE.captures(&input)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    part(1)?
        .checked_mul(3600)?
        .checked_add(part(2)?.checked_mul(60)?)?
        .checked_add(part(3)?)
}

/// Clock-style display for the timer: `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Compact display for listings: `45s`, `25m`, `1h`, `1h30m`.
pub fn format_short(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if secs > 0 || out.is_empty() {
        out.push_str(&format!("{}s", secs));
    }
    out
}
