use super::state::WindowState;
use super::tracker::Thresholds;

/// End-of-window summary. Computed once from the final state, never updated in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateMetrics {
    pub total_listeners: u64,
    pub total_long_listeners: u64,
    pub total_short_listeners: u64,
    pub total_unknown_origin: u64,
    pub total_sessions: u64,
}

impl AggregateMetrics {
    /// Trailer rows in export order.
    pub fn rows(&self) -> [(&'static str, u64); 5] {
        [
            ("Total Listeners", self.total_listeners),
            ("Total Long Listeners", self.total_long_listeners),
            ("Total Short Listeners", self.total_short_listeners),
            ("Total N/A entries", self.total_unknown_origin),
            ("Total Sessions", self.total_sessions),
        ]
    }
}

pub fn aggregate(window: &WindowState, thresholds: &Thresholds) -> AggregateMetrics {
    window
        .records()
        .iter()
        .fold(AggregateMetrics::default(), |mut acc, record| {
            let sessions = record.sessions();
            acc.total_listeners += 1;
            if record.classified_long {
                acc.total_long_listeners += 1;
            }
            if sessions.len() == 1 && sessions[0].duration < thresholds.short {
                acc.total_short_listeners += 1;
            }
            if record.origin.is_unknown() {
                acc.total_unknown_origin += 1;
            }
            acc.total_sessions += sessions.len() as u64;
            acc
        })
}
