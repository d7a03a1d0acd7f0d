use crate::kernel::aggregator::AggregateMetrics;
use crate::kernel::state::{ClientRecord, Session, WindowState};
use crate::kernel::time::{self, Timestamp};

pub const DELIMITER: char = ';';
const HEADER: [&str; 4] = ["ip", "location", "connected_time", "valid"];

/// A detached, completed window handed to the sink.
#[derive(Debug, Clone)]
pub struct WindowReport {
    pub window_started_at: Timestamp,
    pub flushed_at: Timestamp,
    pub records: Vec<ClientRecord>,
    pub metrics: AggregateMetrics,
}

impl WindowReport {
    pub fn new(window: WindowState, flushed_at: Timestamp, metrics: AggregateMetrics) -> Self {
        Self {
            window_started_at: window.started_at,
            flushed_at,
            records: window.into_records(),
            metrics,
        }
    }
}

/// PURE FUNCTION: renders a report as the semicolon-separated export table.
pub fn render(report: &WindowReport) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().map(|h| h.to_string()));

    for record in &report.records {
        push_row(
            &mut out,
            [
                record.id.clone(),
                record.origin.to_string(),
                render_sessions(record.sessions()),
                flag(record.classified_long).to_string(),
            ],
        );
    }

    for (label, count) in report.metrics.rows() {
        push_row(
            &mut out,
            [label.to_string(), String::new(), String::new(), count.to_string()],
        );
    }

    out
}

/// `[HH:MM:SS <secs>s, ...]` in discovery order.
pub fn render_sessions(sessions: &[Session]) -> String {
    let items = sessions
        .iter()
        .map(|s| format!("{} {}s", time::clock_label(&s.started_at), s.duration.as_secs()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", items)
}

fn flag(value: bool) -> u8 {
    if value { 1 } else { 0 }
}

fn push_row<I: IntoIterator<Item = String>>(out: &mut String, fields: I) {
    let line = fields
        .into_iter()
        .map(|f| escape(&f))
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string());
    out.push_str(&line);
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains(DELIMITER) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
