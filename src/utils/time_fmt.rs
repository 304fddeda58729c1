/// Seconds below which the countdown is shown as running low.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 60;

/// Format a countdown as `m:ss`.
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn is_low_time(seconds: u32) -> bool {
    seconds < LOW_TIME_THRESHOLD_SECS
}
