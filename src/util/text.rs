//! Text helpers shared by the filter pipeline, notifications, and display.

use chrono::{DateTime, Utc};

/// Split a comma-separated keyword spec into lowercase, trimmed, non-empty
/// keywords. Used by both the blacklist filter and notification matching.
pub fn parse_keywords(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Case-insensitive substring match of any keyword against `title`.
pub fn title_matches_any(title: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let lower = title.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

/// Compact count formatting for the topic listing: 1234 -> "1.2k".
pub fn format_count(n: i64) -> String {
    if n >= 1000 {
        format!("{:.1}k", n as f64 / 1000.0)
    } else {
        n.to_string()
    }
}

/// Relative age for the topic listing: "now", "5m", "3h", or "06-01".
pub fn format_age(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    if secs < 60 {
        "now".to_string()
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        ts.format("%m-%d").to_string()
    }
}
