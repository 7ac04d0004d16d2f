//! HTTP client for the task metadata endpoint
//!
//! The endpoint lives on the task's local network but is not perfectly
//! reliable, so every fetch retries transport and status failures a bounded
//! number of times with a fixed delay. Response parsing happens after the
//! retry loop; malformed JSON is terminal for the call.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::warn;

use crate::models::{ContainerStats, TaskMetadata};

/// Configuration for the metadata client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the metadata endpoint (from `ECS_CONTAINER_METADATA_URI`)
    pub base_url: String,
    /// Per-request timeout so a hung endpoint cannot block a tick
    pub request_timeout: Duration,
    /// Attempts per fetch before giving up
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout: Duration::from_secs(5),
            max_attempts: 4,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Errors from a metadata fetch.
///
/// `Transport` and `Status` are retried inside the fetch call; `Parse` is
/// terminal for that call.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("unable to get response from '{endpoint}': {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("incorrect status code {status} from '{endpoint}'")]
    Status {
        endpoint: String,
        status: StatusCode,
    },
    #[error("unable to parse response body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for the `{base}/task` and `{base}/task/stats` endpoints, sharing
/// one bounded-timeout HTTP client.
pub struct MetadataClient {
    http: reqwest::Client,
    task_url: String,
    stats_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl MetadataClient {
    /// Create a new client. An empty base URL is accepted here; every fetch
    /// against it fails, which the startup readiness loop turns into the
    /// fatal error the missing environment variable deserves.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            task_url: format!("{}/task", config.base_url),
            stats_url: format!("{}/task/stats", config.base_url),
            http,
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay,
        })
    }

    /// Get the task metadata endpoint URL
    pub fn task_url(&self) -> &str {
        &self.task_url
    }

    /// Get the task stats endpoint URL
    pub fn stats_url(&self) -> &str {
        &self.stats_url
    }

    /// Fetch the task metadata snapshot.
    pub async fn fetch_task_metadata(&self) -> Result<TaskMetadata, MetadataError> {
        let body = self.fetch_with_retries(&self.task_url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch per-container stats, keyed by container ID.
    ///
    /// A `None` value means the engine has no stats for that container right
    /// now; callers skip it rather than treating it as an error.
    pub async fn fetch_task_stats(
        &self,
    ) -> Result<HashMap<String, Option<ContainerStats>>, MetadataError> {
        let body = self.fetch_with_retries(&self.stats_url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// GET the endpoint, retrying transport/status failures up to the
    /// configured attempt budget and returning the last error on exhaustion.
    async fn fetch_with_retries(&self, endpoint: &str) -> Result<Vec<u8>, MetadataError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(endpoint).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    attempt += 1;
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Metadata fetch attempt failed"
                    );
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self, endpoint: &str) -> Result<Vec<u8>, MetadataError> {
        let response =
            self.http
                .get(endpoint)
                .send()
                .await
                .map_err(|source| MetadataError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                })?;

        if response.status() != StatusCode::OK {
            return Err(MetadataError::Status {
                endpoint: endpoint.to_string(),
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| MetadataError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(body.to_vec())
    }
}
