/// DID document retrieval over HTTPS
use async_trait::async_trait;
use reqwest::redirect;
use std::time::Duration;
use thiserror::Error;

/// Reasons a document could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("server returned status {0}")]
    HttpStatus(u16),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Fetches a JSON document from a URL
///
/// Injected into the resolver so tests can script responses without a
/// network.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// reqwest-backed fetcher with a bounded per-request timeout
#[derive(Clone)]
pub struct HttpsDocumentFetcher {
    client: reqwest::Client,
}

impl HttpsDocumentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        // Redirects may not downgrade to plaintext
        let policy = redirect::Policy::custom(|attempt| {
            if attempt.url().scheme() != "https" {
                attempt.stop()
            } else if attempt.previous().len() >= 5 {
                attempt.error("too many redirects")
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .user_agent(concat!("vc-trust/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .redirect(policy)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpsDocumentFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/did+json, application/json")
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::InvalidJson(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}
