pub mod csv;
pub mod report;

pub use csv::{CsvSink, Sink, SinkError, SinkOutcome};
pub use report::WindowReport;
