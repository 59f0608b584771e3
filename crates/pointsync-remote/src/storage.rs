//! Texture store client: resolves image ids to URLs and fetches bytes

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("Request for {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("Fetch of {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Remote storage serving image bytes by id.
///
/// Fetches are bounded by the implementation's timeout; a stalled
/// request fails instead of hanging its task forever.
pub trait TextureStore: Send + Sync + 'static {
    /// Resolve an image id to a fetchable URL
    fn resolve_url(&self, image_id: &str) -> String;

    /// Fetch the raw image bytes at a resolved URL
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send;
}

/// HTTP-backed texture store.
///
/// Images live at `{base}/images/{id}.png`, where `{id}` is the image
/// id with its `.png` extension stripped.
pub struct HttpTextureStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTextureStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StorageError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TextureStore for HttpTextureStore {
    fn resolve_url(&self, image_id: &str) -> String {
        let id = image_id.strip_suffix(".png").unwrap_or(image_id);
        format!("{}/images/{}.png", self.base_url, id)
    }

    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send {
        let client = self.client.clone();
        let url = url.to_string();
        async move {
            debug!(url = %url, "Fetching texture");
            let response = client.get(&url).send().await.map_err(|e| {
                StorageError::Request {
                    url: url.clone(),
                    source: e,
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(StorageError::Status { url, status });
            }

            let bytes = response.bytes().await.map_err(|e| StorageError::Request {
                url: url.clone(),
                source: e,
            })?;
            Ok(bytes.to_vec())
        }
    }
}
