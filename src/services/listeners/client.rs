use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::wire::parse_listeners;
use crate::kernel::event::Observation;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("listener source unavailable: {0}")]
    Unavailable(String),
    #[error("listener source returned {0}")]
    Status(u16),
    #[error("malformed listener response: {0}")]
    Malformed(String),
    #[error("listener fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Anything that can produce the current set of connected clients.
pub trait ObservationSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Observation>, SourceError>> + Send;
}

#[derive(Clone)]
pub struct ListenerService {
    client: Client,
    url: String,
    authorization: String,
    timeout: Duration,
}

impl ListenerService {
    pub fn new(url: impl Into<String>, api_key: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            authorization: authorization_value(api_key),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

impl ObservationSource for ListenerService {
    async fn fetch(&self) -> Result<Vec<Observation>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let observations = parse_listeners(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;
        debug!(count = observations.len(), "fetched listeners");
        Ok(observations)
    }
}

/// Keys copied from the station admin panel already carry the scheme.
fn authorization_value(api_key: &str) -> String {
    let key = api_key.trim();
    if key.starts_with("Bearer ") {
        key.to_string()
    } else {
        format!("Bearer {}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::authorization_value;

    #[test]
    fn bearer_prefix_is_added_once() {
        assert_eq!(authorization_value("abc"), "Bearer abc");
        assert_eq!(authorization_value("Bearer abc"), "Bearer abc");
    }
}
