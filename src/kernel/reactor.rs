use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::aggregator::aggregate;
use super::event::Observation;
use super::state::WindowState;
use super::telemetry::event::{ExportOutcome, SkipReason, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{self, Timestamp};
use super::tracker::{ingest, IngestReport, Thresholds};
use crate::config::Config;
use crate::outputs::{Sink, SinkOutcome, WindowReport};
use crate::services::listeners::{ObservationSource, SourceError};

#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    pub poll_interval: Duration,
    pub window_length: Duration,
    pub fetch_timeout: Duration,
    pub thresholds: Thresholds,
}

impl From<&Config> for ReactorConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            window_length: config.window_length,
            fetch_timeout: config.fetch_timeout,
            thresholds: config.thresholds,
        }
    }
}

/// Window lifecycle controller.
///
/// Owns the window exclusively. Polling and flushing both run on the task
/// driving [`Reactor::run`], so an ingestion never interleaves with an
/// aggregation. Sink writes get a detached copy and run on the blocking pool.
pub struct Reactor<S, K> {
    source: S,
    sink: Arc<K>,
    config: ReactorConfig,
    window: WindowState,
    pub telemetry: TelemetryRecorder,
    ingested_since_flush: bool,
    window_unknown_origin: u64,
    writes: TaskTracker,
    export_tx: mpsc::UnboundedSender<ExportOutcome>,
    export_rx: mpsc::UnboundedReceiver<ExportOutcome>,
}

impl<S, K> Reactor<S, K>
where
    S: ObservationSource,
    K: Sink,
{
    pub fn new(source: S, sink: Arc<K>, config: ReactorConfig, started_at: Timestamp) -> Self {
        let (export_tx, export_rx) = mpsc::unbounded_channel();
        Self {
            source,
            sink,
            config,
            window: WindowState::new(started_at),
            telemetry: TelemetryRecorder::new(),
            ingested_since_flush: false,
            window_unknown_origin: 0,
            writes: TaskTracker::new(),
            export_tx,
            export_rx,
        }
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    /// True when a snapshot with at least one observation landed after the last flush.
    pub fn has_unflushed(&self) -> bool {
        self.ingested_since_flush
    }

    /// Unresolved-location observations ingested into the current window.
    pub fn window_unknown_origin(&self) -> u64 {
        self.window_unknown_origin
    }

    /// Applies one fetch result at `now`. A failed fetch or a rejected
    /// snapshot leaves the window exactly as it was.
    pub fn poll_step(
        &mut self,
        fetched: Result<Vec<Observation>, SourceError>,
        now: Timestamp,
    ) -> Option<IngestReport> {
        let observations = match fetched {
            Ok(observations) => observations,
            Err(e) => {
                warn!(error = %e, "snapshot skipped");
                self.telemetry.record(TelemetryEvent::PollSkipped { reason: skip_reason(&e) });
                return None;
            }
        };

        match ingest(&observations, now, &mut self.window, &self.config.thresholds) {
            Ok(report) => {
                debug!(?report, "snapshot ingested");
                if report.unknown_origin > 0 {
                    info!(count = report.unknown_origin, "listeners with unresolved location");
                }
                if report.observations > 0 {
                    self.ingested_since_flush = true;
                }
                self.window_unknown_origin += report.unknown_origin as u64;
                self.telemetry.record(TelemetryEvent::from(&report));
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "snapshot rejected");
                self.telemetry.record(TelemetryEvent::PollSkipped {
                    reason: SkipReason::ClockRegression,
                });
                None
            }
        }
    }

    /// Aggregates the current window and replaces it with an empty one starting at `now`.
    pub fn flush_step(&mut self, now: Timestamp) -> WindowReport {
        let metrics = aggregate(&self.window, &self.config.thresholds);
        let completed = self.window.reset(now);
        let unknown_origin_observations = std::mem::take(&mut self.window_unknown_origin);
        self.ingested_since_flush = false;

        info!(
            listeners = metrics.total_listeners,
            long = metrics.total_long_listeners,
            short = metrics.total_short_listeners,
            unknown_origin = metrics.total_unknown_origin,
            sessions = metrics.total_sessions,
            unknown_origin_observations,
            "window closed"
        );
        self.telemetry.record(TelemetryEvent::WindowFlushed {
            listeners: metrics.total_listeners,
            sessions: metrics.total_sessions,
            unknown_origin_observations,
        });

        WindowReport::new(completed, now, metrics)
    }

    /// Fetches one snapshot (bounded by the fetch timeout) and ingests it.
    pub async fn poll(&mut self) -> Option<IngestReport> {
        let limit = self.config.fetch_timeout;
        let fetched = match timeout(limit, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(limit)),
        };
        self.poll_step(fetched, time::now())
    }

    /// Closes the window at `now` and hands it to the sink in the background.
    pub fn flush(&mut self, now: Timestamp) {
        let report = self.flush_step(now);
        let sink = Arc::clone(&self.sink);
        let tx = self.export_tx.clone();
        self.writes.spawn_blocking(move || {
            let outcome = export(sink.as_ref(), &report);
            let _ = tx.send(outcome);
        });
    }

    /// Waits for in-flight sink writes and records their outcomes.
    pub async fn finish(&mut self) {
        self.writes.close();
        self.writes.wait().await;
        self.drain_exports();
        self.writes.reopen();
    }

    fn drain_exports(&mut self) {
        while let Ok(outcome) = self.export_rx.try_recv() {
            self.telemetry.record(TelemetryEvent::Export(outcome));
        }
    }

    /// Drives polling and flushing until `shutdown` is cancelled, then flushes
    /// a final time if anything was ingested since the last flush.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            poll_secs = self.config.poll_interval.as_secs(),
            window_secs = self.config.window_length.as_secs_f64(),
            "window reactor started"
        );

        let mut poll_cadence = interval(self.config.poll_interval);
        poll_cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let window_length = self.config.window_length;
        let mut flush_cadence = interval_at(Instant::now() + window_length, window_length);
        flush_cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = flush_cadence.tick() => self.flush(time::now()),
                _ = poll_cadence.tick() => {
                    self.poll().await;
                }
            }
            self.drain_exports();
        }

        drop(poll_cadence);
        drop(flush_cadence);

        if self.ingested_since_flush {
            info!("flushing partial window before shutdown");
            self.flush(time::now());
        }
        self.finish().await;
        info!("window reactor stopped");
    }
}

fn skip_reason(err: &SourceError) -> SkipReason {
    match err {
        SourceError::Unavailable(_) => SkipReason::SourceUnavailable,
        SourceError::Status(_) => SkipReason::SourceStatus,
        SourceError::Malformed(_) => SkipReason::MalformedResponse,
        SourceError::Timeout(_) => SkipReason::Timeout,
    }
}

fn export<K: Sink + ?Sized>(sink: &K, report: &WindowReport) -> ExportOutcome {
    match sink.write(report) {
        Ok(SinkOutcome::Written(path)) => {
            info!(path = %path.display(), records = report.records.len(), "window exported");
            ExportOutcome::Written
        }
        Ok(SinkOutcome::Fallback { path, primary_error }) => {
            warn!(
                path = %path.display(),
                error = %primary_error,
                "output location unwritable, exported to fallback location"
            );
            ExportOutcome::Fallback
        }
        Err(e) => {
            error!(
                error = %e,
                records = report.records.len(),
                window_started_at = %report.window_started_at,
                "window data lost"
            );
            ExportOutcome::Lost
        }
    }
}
