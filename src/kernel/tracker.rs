use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::event::Observation;
use super::state::{ClientRecord, Session, WindowState};
use super::time::{self, Timestamp};

pub const DEFAULT_LONG_THRESHOLD: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SHORT_THRESHOLD: Duration = Duration::from_secs(60);

/// Classification boundaries. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// A session strictly longer than this makes the client a long listener.
    pub long: Duration,
    /// A single-session client strictly shorter than this is a short listener.
    pub short: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            long: DEFAULT_LONG_THRESHOLD,
            short: DEFAULT_SHORT_THRESHOLD,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("clock regression: snapshot taken at {now} precedes window start {window_start}")]
    ClockRegression {
        now: Timestamp,
        window_start: Timestamp,
    },
}

/// Per-call diagnostics. `unknown_origin` counts observations, not clients,
/// and is independent of the end-of-window aggregate recount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub observations: usize,
    pub new_clients: usize,
    pub continued: usize,
    pub restarted: usize,
    pub capped: usize,
    pub unknown_origin: usize,
}

/// Reconciles one snapshot against the window.
///
/// Observations are applied in encounter order, so a client listed twice in
/// the same batch is reconciled twice. The window is left untouched when an
/// error is returned.
pub fn ingest(
    observations: &[Observation],
    now: Timestamp,
    window: &mut WindowState,
    thresholds: &Thresholds,
) -> Result<IngestReport, TrackerError> {
    let window_age = time::elapsed(window.started_at, now).ok_or(TrackerError::ClockRegression {
        now,
        window_start: window.started_at,
    })?;

    let mut report = IngestReport {
        observations: observations.len(),
        ..IngestReport::default()
    };

    for obs in observations {
        if obs.origin.is_unknown() {
            report.unknown_origin += 1;
        }

        // Upstream counters can predate the window (listener carried over from the previous one).
        let effective = obs.reported_duration.min(window_age);
        if effective < obs.reported_duration {
            report.capped += 1;
        }
        debug_assert!(effective <= window_age);

        let is_long = effective > thresholds.long;

        match window.get_mut(&obs.client_id) {
            None => {
                window.insert(ClientRecord::new(
                    obs.client_id.clone(),
                    obs.origin.clone(),
                    Session {
                        started_at: now,
                        duration: effective,
                    },
                    is_long,
                ));
                report.new_clients += 1;
            }
            Some(record) => {
                let last = record.last_session_mut();
                if effective >= last.duration {
                    last.duration = effective;
                    // Sticky while the session stays open.
                    record.classified_long = record.classified_long || is_long;
                    report.continued += 1;
                } else {
                    debug!(
                        client = %obs.client_id,
                        previous_secs = last.duration.as_secs(),
                        reported_secs = effective.as_secs(),
                        "connected time dropped, opening new session"
                    );
                    record.push_session(Session {
                        started_at: now,
                        duration: effective,
                    });
                    record.classified_long = is_long;
                    report.restarted += 1;
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::event::Origin;
    use chrono::{Local, TimeZone};

    fn start() -> Timestamp {
        Local.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn clock_regression_leaves_window_untouched() {
        let mut window = WindowState::new(start());
        let earlier = start() - chrono::Duration::seconds(5);
        let obs = [Observation::new("10.0.0.1", Origin::Unknown, 3)];

        let err = ingest(&obs, earlier, &mut window, &Thresholds::default()).unwrap_err();
        assert!(matches!(err, TrackerError::ClockRegression { .. }));
        assert!(window.is_empty());
    }

    #[test]
    fn exactly_long_threshold_is_not_long() {
        let mut window = WindowState::new(start());
        let now = start() + chrono::Duration::hours(1);
        let obs = [Observation::new("a", Origin::Country("HU".into()), 300)];

        ingest(&obs, now, &mut window, &Thresholds::default()).unwrap();
        assert!(!window.get("a").unwrap().classified_long);
    }
}
