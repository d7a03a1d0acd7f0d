//! Run diagnostics for the window lifecycle.
//!
//! Telemetry is a side-effect layer: the reactor records into it, nothing in
//! the tracker or aggregator reads from it. Events carry counts and reasons
//! only, never listener identifiers.

pub mod event;
pub mod metrics;
pub mod recorder;
