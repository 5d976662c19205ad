//! HTTP transport for the remote blacklist.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::error::{ControllerError, Result};

const TIMEOUT_SECS: u64 = 30;

/// Maximum accepted body size (32 MB).
/// The full voipbl.org list is a few MB, so this leaves ample margin.
const MAX_LIST_SIZE: usize = 32 * 1024 * 1024;

/// Retrieves the raw bytes of a remote list.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ListFetcher: Send + Sync {
    /// Download `url`. Transport failures, non-success statuses and empty
    /// bodies are all [`ControllerError::Fetch`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-based [`ListFetcher`]. One attempt per call; the polling
/// interval is the only retry mechanism.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(format!("voipbl-rtbh/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ListFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {}...", url);

        let fail = |reason: String| {
            ControllerError::Fetch(format!(
                "Unable to download the blacklist from {}: {}",
                url, reason
            ))
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > MAX_LIST_SIZE {
                return Err(fail(format!(
                    "response too large: {} bytes (max: {} bytes)",
                    content_length, MAX_LIST_SIZE
                )));
            }
        }

        let body = response.bytes().await.map_err(|e| fail(e.to_string()))?;

        if body.len() > MAX_LIST_SIZE {
            return Err(fail(format!(
                "downloaded content too large: {} bytes (max: {} bytes)",
                body.len(),
                MAX_LIST_SIZE
            )));
        }

        if body.is_empty() {
            return Err(fail("empty response body".to_string()));
        }

        debug!("Downloaded {} from {}", format_count(body.len()), url);
        Ok(body.to_vec())
    }
}

/// Format a count with K/M suffix
pub fn format_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
