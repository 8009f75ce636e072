//! Duration parsing utilities.

use anyhow::Context;

/// Parse a duration string like "2d", "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
/// - Days suffix: "5d"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, unit, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, "days", 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, "hours", 3_600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "minutes", 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "seconds", 1)
    } else {
        (s, "duration", 1)
    };

    let value: i64 = num_str
        .parse()
        .with_context(|| format!("Invalid {unit} value: {num_str}"))?;
    if value < 0 {
        anyhow::bail!("Negative duration: {s}");
    }
    value
        .checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {s}"))
}

/// Parse a duration string into a [`std::time::Duration`].
pub fn parse_duration(s: &str) -> anyhow::Result<std::time::Duration> {
    let secs = parse_duration_to_secs(s)?;
    Ok(std::time::Duration::from_secs(secs.unsigned_abs()))
}
