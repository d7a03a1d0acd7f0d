pub mod config;
pub mod kernel;
pub mod outputs;
pub mod services;

// Entry points for the binary
pub use kernel::reactor::{Reactor, ReactorConfig};
