//! HTTP client abstraction for testability

use super::types::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent string for HTTP requests.
/// Some tile servers reject requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("geoai/", env!("CARGO_PKG_VERSION"));

/// Trait for asynchronous HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. Tile fetches and model weight
/// downloads both go through it.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Real HTTP client implementation using reqwest.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_options(DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT)
    }

    /// Creates a new AsyncReqwestClient with custom timeout and user agent.
    pub fn with_options(timeout_secs: u64, user_agent: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            // Tile grids issue up to a hundred requests against one host at once
            .pool_max_idle_per_host(128)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl Default for AsyncReqwestClient {
    fn default() -> Self {
        Self::new().expect("Failed to create default async HTTP client")
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        trace!(url = redact_query(url), "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "HTTP response received");
                resp
            }
            Err(e) => {
                // reqwest errors embed the full URL, query string included
                let (is_connect, is_timeout) = (e.is_connect(), e.is_timeout());
                let e = e.without_url();
                warn!(
                    url = redact_query(url),
                    error = %e,
                    is_connect = is_connect,
                    is_timeout = is_timeout,
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!(
                    "Request to {} failed: {}",
                    redact_query(url),
                    e
                )));
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "HTTP error status");
            return Err(ProviderError::HttpError(format!(
                "HTTP {} from {}",
                response.status(),
                redact_query(url)
            )));
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                let e = e.without_url();
                warn!(error = %e, "Failed to read response body");
                Err(ProviderError::HttpError(format!(
                    "Failed to read response from {}: {}",
                    redact_query(url),
                    e
                )))
            }
        }
    }
}

/// Drops the query string, which usually carries the API key.
pub(crate) fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
