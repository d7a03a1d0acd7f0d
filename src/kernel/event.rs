use std::fmt;
use std::time::Duration;

pub type ClientId = String;

/// Where a listener connects from. The upstream geo lookup sometimes fails
/// and flags the location as unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Country(String),
    Unknown,
}

impl Origin {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Origin::Unknown)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Country(code) => f.write_str(code),
            Origin::Unknown => f.write_str("N/A"),
        }
    }
}

/// One listener as reported by one snapshot. Consumed once by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub client_id: ClientId,
    pub origin: Origin,
    /// Cumulative connected time as the source reports it (may predate the window).
    pub reported_duration: Duration,
}

impl Observation {
    pub fn new(client_id: impl Into<String>, origin: Origin, reported_secs: u64) -> Self {
        Self {
            client_id: client_id.into(),
            origin,
            reported_duration: Duration::from_secs(reported_secs),
        }
    }
}
