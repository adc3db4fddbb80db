//! Time formatting helpers for admin output.

use tronguard_types::Timestamp;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Describe an optional expiry relative to `now`: `"permanent"`,
/// `"expired"`, or `"expires in 3h 2m"`.
pub fn describe_expiry(expires_at: Option<Timestamp>, now: Timestamp) -> String {
    match expires_at {
        None => "permanent".to_string(),
        Some(at) if at <= now => "expired".to_string(),
        Some(at) => format!("expires in {}", format_duration(now.elapsed_since(at))),
    }
}
