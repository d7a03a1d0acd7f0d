use chrono::{DateTime, Local};
use std::time::Duration;

/// Wall-clock instant, local timezone (exports are keyed by local date and time).
pub type Timestamp = DateTime<Local>;

pub fn now() -> Timestamp {
    Local::now()
}

/// Time elapsed from `since` to `now`, or `None` when the clock went backwards.
pub fn elapsed(since: Timestamp, now: Timestamp) -> Option<Duration> {
    (now - since).to_std().ok()
}

/// `HH:MM:SS`, as shown in session histories.
pub fn clock_label(at: &Timestamp) -> String {
    at.format("%H:%M:%S").to_string()
}

/// `YYYY-MM-DD_HHMM`, the flush key used in export filenames.
pub fn export_key(at: &Timestamp) -> String {
    at.format("%Y-%m-%d_%H%M").to_string()
}
