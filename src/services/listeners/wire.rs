use serde::Deserialize;

use crate::kernel::event::{Observation, Origin};

const STATUS_ERROR: &str = "error";

#[derive(Debug, Deserialize)]
struct ListenerRecord {
    ip: String,
    connected_time: u64,
    #[serde(default)]
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl From<ListenerRecord> for Observation {
    fn from(record: ListenerRecord) -> Self {
        let origin = match record.location {
            Some(Location { status: Some(status), .. }) if status == STATUS_ERROR => Origin::Unknown,
            Some(Location { country: Some(country), .. }) if !country.trim().is_empty() => {
                Origin::Country(country)
            }
            _ => Origin::Unknown,
        };
        Observation::new(record.ip, origin, record.connected_time)
    }
}

/// Decodes a listeners response body. Unknown fields are ignored.
pub fn parse_listeners(body: &str) -> Result<Vec<Observation>, serde_json::Error> {
    let records: Vec<ListenerRecord> = serde_json::from_str(body)?;
    Ok(records.into_iter().map(Observation::from).collect())
}
