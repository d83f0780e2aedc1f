//! HTTP repository client backed by reqwest's blocking API
//!
//! Each request carries its own bounded timeout, independent of the caller's
//! retry ceiling. Status mapping: 404 is a clean not-found (the caller moves
//! on to the next repository), anything else non-2xx is a transport error
//! (the caller retries).

use std::time::Duration;

use crate::domain::{Coordinate, DependencyDescriptor, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};
use crate::repository::{RepositoryClient, parse_descriptor, resource_url};

/// Default per-attempt network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpRepositoryClient {
    client: reqwest::blocking::Client,
}

impl HttpRepositoryClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("jumpstart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JumpstartError::IoError {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// GET `url`, mapping 404 to `Ok(None)` and transport-level failures
    /// (DNS, timeout, 5xx, any non-success status) to `Transport`.
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| JumpstartError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(JumpstartError::Transport {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().map_err(|e| JumpstartError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(bytes.to_vec()))
    }
}

impl RepositoryClient for HttpRepositoryClient {
    fn fetch_descriptor(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<DependencyDescriptor>> {
        let url = resource_url(&repository.url, coordinate, "json");
        match self.get(&url)? {
            Some(bytes) => Ok(Some(parse_descriptor(
                &bytes,
                coordinate,
                &repository.id,
                &url,
            )?)),
            None => Ok(None),
        }
    }

    fn fetch_artifact(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<Vec<u8>>> {
        let url = resource_url(&repository.url, coordinate, "bin");
        self.get(&url)
    }
}
