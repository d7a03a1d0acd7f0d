//! Observation Source: the station's "currently connected listeners" endpoint.

pub mod client;
pub mod wire;

pub use client::{ListenerService, ObservationSource, SourceError};
