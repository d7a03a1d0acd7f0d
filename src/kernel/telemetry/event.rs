use crate::kernel::tracker::IngestReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    PollIngested {
        observations: usize,
        new_clients: usize,
        restarted: usize,
        unknown_origin: usize,
    },

    PollSkipped {
        reason: SkipReason,
    },

    WindowFlushed {
        listeners: u64,
        sessions: u64,
        /// Ingestion-time tally for the window being closed.
        unknown_origin_observations: u64,
    },

    Export(ExportOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SourceUnavailable,
    SourceStatus,
    MalformedResponse,
    Timeout,
    ClockRegression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written,
    Fallback,
    Lost,
}

impl From<&IngestReport> for TelemetryEvent {
    fn from(report: &IngestReport) -> Self {
        TelemetryEvent::PollIngested {
            observations: report.observations,
            new_clients: report.new_clients,
            restarted: report.restarted,
            unknown_origin: report.unknown_origin,
        }
    }
}
