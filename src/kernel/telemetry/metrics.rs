use std::collections::VecDeque;
use super::event::{ExportOutcome, SkipReason, TelemetryEvent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub poll_stats: PollStats,
    pub window_stats: WindowStats,
    pub export_stats: ExportStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStats {
    pub ingested: u64,
    pub skipped: u64,
    pub source_failures: u64,
    pub timeouts: u64,
    pub clock_regressions: u64,
    pub observations: u64,
    /// Ingestion-time tally for the current window; counts observations, so
    /// it can exceed the aggregate N/A count. Cleared by each flush.
    pub unknown_origin_observations: u64,
    pub avg_observations_per_poll: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub flushed: u64,
    pub listeners: u64,
    pub sessions: u64,
    pub unknown_origin_observations: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub written: u64,
    pub fallback: u64,
    pub lost: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::PollIngested { observations, unknown_origin, .. } => {
                snap.poll_stats.ingested += 1;
                snap.poll_stats.observations += *observations as u64;
                snap.poll_stats.unknown_origin_observations += *unknown_origin as u64;
            }
            TelemetryEvent::PollSkipped { reason } => {
                snap.poll_stats.skipped += 1;
                match reason {
                    SkipReason::SourceUnavailable
                    | SkipReason::SourceStatus
                    | SkipReason::MalformedResponse => snap.poll_stats.source_failures += 1,
                    SkipReason::Timeout => snap.poll_stats.timeouts += 1,
                    SkipReason::ClockRegression => snap.poll_stats.clock_regressions += 1,
                }
            }
            TelemetryEvent::WindowFlushed { listeners, sessions, unknown_origin_observations } => {
                snap.window_stats.flushed += 1;
                snap.window_stats.listeners += listeners;
                snap.window_stats.sessions += sessions;
                snap.window_stats.unknown_origin_observations += unknown_origin_observations;
                snap.poll_stats.unknown_origin_observations = 0;
            }
            TelemetryEvent::Export(outcome) => match outcome {
                ExportOutcome::Written => snap.export_stats.written += 1,
                ExportOutcome::Fallback => snap.export_stats.fallback += 1,
                ExportOutcome::Lost => snap.export_stats.lost += 1,
            },
        }
    }

    if snap.poll_stats.ingested > 0 {
        snap.poll_stats.avg_observations_per_poll =
            snap.poll_stats.observations as f64 / snap.poll_stats.ingested as f64;
    }

    snap
}
