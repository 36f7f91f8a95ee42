//! Buffered response snapshots.
//!
//! A live HTTP response body can only be read once. The store and the
//! caller both need the bytes, so the body is buffered into a snapshot at
//! capture time and cloned from there (`bytes::Bytes` makes the clone a
//! refcount bump, not a copy).

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// A stored copy of an HTTP response: status, headers, body, capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    cached_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Creates a snapshot from already-buffered parts.
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            cached_at: Utc::now(),
        }
    }

    /// Rebuilds a snapshot with an explicit capture time (disk store reload).
    #[must_use]
    pub fn with_cached_at(
        status: u16,
        headers: Vec<(String, String)>,
        body: impl Into<Bytes>,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            cached_at,
        }
    }

    /// Captures a live `reqwest` response, consuming its body stream.
    ///
    /// Header values that are not valid UTF-8 are stored lossily.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails mid-stream.
    pub async fn from_network(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
            cached_at: Utc::now(),
        })
    }

    /// HTTP status code of the captured response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Captured headers, in response order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the first header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body length in bytes.
    #[must_use]
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }

    /// When this snapshot was captured.
    #[must_use]
    pub const fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }
}
