//! Federal Reserve H.8 release download.
//!
//! The release is published as a ZIP of SDMX-style XML documents. Fetching is a
//! single bounded-duration attempt; there is no retry at this layer.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::config::AppConfig;
use crate::error::IngestError;

/// Default download location for the full H.8 release.
pub const DEFAULT_H8_URL: &str =
    "https://www.federalreserve.gov/datadownload/Output.aspx?rel=H8&filetype=zip";

/// Source of raw archive bytes for one ingestion cycle.
pub trait ArchiveFetcher {
    /// Human-readable origin, used in log lines.
    fn source(&self) -> &str;

    fn fetch(&self) -> Result<Vec<u8>, IngestError>;
}

/// Fetches the release over HTTPS.
pub struct H8Client {
    client: Client,
    url: String,
    timeout: Duration,
}

impl H8Client {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        Self::new(config.h8_data_url.clone(), config.fetch_timeout)
    }
}

impl ArchiveFetcher for H8Client {
    fn source(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<Vec<u8>, IngestError> {
        info!(url = %self.url, "Downloading H.8 release");

        let resp = self.client.get(&self.url).send().map_err(|e| {
            if e.is_timeout() {
                IngestError::Timeout(self.timeout.as_secs())
            } else {
                IngestError::Network(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(IngestError::Network(format!(
                "H.8 download failed with status {}",
                resp.status()
            )));
        }

        let bytes = resp.bytes().map_err(|e| {
            if e.is_timeout() {
                IngestError::Timeout(self.timeout.as_secs())
            } else {
                IngestError::Network(format!("failed to read response body: {e}"))
            }
        })?;

        info!(bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }
}

/// An archive already held in memory (synthetic releases, tests).
pub struct InMemoryArchive {
    label: String,
    bytes: Vec<u8>,
}

impl InMemoryArchive {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }
}

impl ArchiveFetcher for InMemoryArchive {
    fn source(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<Vec<u8>, IngestError> {
        Ok(self.bytes.clone())
    }
}
