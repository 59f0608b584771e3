//! Outbound state publishing: the `ml-state` flag written back to the
//! remote database
//!
//! Fire-and-forget at call sites: the daemon spawns the write and logs
//! failure, the event loop never waits on it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// The boolean flag pushed to the database's `ml-state` path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlState {
    pub state: bool,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("Write to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("Write to {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Writer for the outbound state flag
pub trait StatePublisher: Send + Sync + 'static {
    fn publish(&self, state: bool) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// HTTP-backed publisher writing `{"state":<bool>}` to
/// `{base}/{path}.json`
pub struct HttpStatePublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpStatePublisher {
    pub fn new(base_url: &str, path: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PublishError::Client)?;
        let url = format!(
            "{}/{}.json",
            base_url.trim_end_matches('/'),
            path.trim_matches('/')
        );
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl StatePublisher for HttpStatePublisher {
    fn publish(&self, state: bool) -> impl Future<Output = Result<(), PublishError>> + Send {
        let client = self.client.clone();
        let url = self.url.clone();
        async move {
            debug!(url = %url, state = state, "Publishing ml-state");
            let response = client
                .put(&url)
                .json(&MlState { state })
                .send()
                .await
                .map_err(|e| PublishError::Request {
                    url: url.clone(),
                    source: e,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(PublishError::Status { url, status });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ml_state_json_shape() {
        assert_eq!(
            serde_json::to_string(&MlState { state: true }).unwrap(),
            r#"{"state":true}"#
        );
        assert_eq!(
            serde_json::to_string(&MlState { state: false }).unwrap(),
            r#"{"state":false}"#
        );
    }

    #[test]
    fn test_publisher_url() {
        let publisher = HttpStatePublisher::new(
            "https://db.example.com/",
            "ml-state",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(publisher.url(), "https://db.example.com/ml-state.json");
    }
}
