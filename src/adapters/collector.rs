//! Collector Endpoint Probe
//!
//! Checks once at startup whether the downstream collector that scrapes or
//! receives our metrics is reachable. An unreachable collector is reported
//! but never stops the generator.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One-shot reachability probe for a collector endpoint
pub struct CollectorProbe {
    client: Client,
    endpoint: String,
}

impl CollectorProbe {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Issue a GET against the endpoint. Any HTTP response counts as
    /// reachable; only transport failures are errors.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn check(&self) -> Result<StatusCode> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(Error::CollectorConnection)?;

        let status = response.status();
        debug!("Collector responded with {}", status);
        Ok(status)
    }
}

impl std::fmt::Debug for CollectorProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorProbe")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
