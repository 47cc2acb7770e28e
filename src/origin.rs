//! Remote origin access.
//!
//! The origin is the legacy host that still serves `/uploads/...`. The sync
//! pass only needs one operation from it, a GET of the raw bytes at a URL,
//! expressed as the [`Origin`] trait so the pass can run against a fake in
//! tests.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// A failed download of a single asset. Never fatal for a sync pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} ({status})")]
    Status { url: String, status: u16 },
    #[error("{url} ({message})")]
    Transport { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. } | FetchError::Transport { url, .. } => url,
        }
    }

    /// The status code or transport message, without the URL.
    pub fn reason(&self) -> String {
        match self {
            FetchError::Status { status, .. } => status.to_string(),
            FetchError::Transport { message, .. } => message.clone(),
        }
    }
}

/// Source of raw asset bytes.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Download the full body at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`Origin`] backed by `reqwest` with a per-request timeout.
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("portal-media/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_names_url_and_cause() {
        let e = FetchError::Status {
            url: "https://cdn.example/uploads/a.png".to_string(),
            status: 404,
        };
        assert_eq!(e.to_string(), "https://cdn.example/uploads/a.png (404)");
        assert_eq!(e.reason(), "404");

        let e = FetchError::Transport {
            url: "https://cdn.example/uploads/b.png".to_string(),
            message: "operation timed out".to_string(),
        };
        assert_eq!(e.url(), "https://cdn.example/uploads/b.png");
        assert!(e.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let origin = HttpOrigin::new(Duration::from_secs(2)).unwrap();
        let err = origin
            .fetch("http://127.0.0.1:9/uploads/a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
