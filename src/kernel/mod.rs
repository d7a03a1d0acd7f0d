pub mod aggregator;
pub mod event;
pub mod reactor;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod tracker;
