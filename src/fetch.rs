//! Network fetch abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::CachedResponse;

/// Abstraction over live resource fetching for testability.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Fetches `url` and buffers the response into a snapshot.
    ///
    /// `url` may be root-relative; implementations resolve it against
    /// their configured origin. A response is returned whatever its
    /// status; only transport failures are errors.
    async fn fetch(&self, url: &str) -> Result<CachedResponse>;
}

/// Builds a tuned HTTP client for resource fetching.
///
/// # Errors
///
/// Returns an error if the client cannot be constructed.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// Default fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client and the given origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(origin: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(build_http_client()?, origin))
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let mut origin = origin.into();
        while origin.ends_with('/') {
            origin.pop();
        }
        Self { client, origin }
    }

    /// Origin used for root-relative identifiers.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resolves a possibly root-relative identifier to an absolute URL.
    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{url}", self.origin)
        }
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<CachedResponse> {
        let response = self.client.get(self.absolute_url(url)).send().await?;
        CachedResponse::from_network(response).await
    }
}
