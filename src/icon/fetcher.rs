use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::redirect::Policy;
use thiserror::Error;

use crate::config::FetchConfig;
use crate::util::{validate_url, UrlValidationError};

const MAX_REDIRECTS: usize = 3;

/// Errors from a single HTTP GET.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL was refused before any request was made.
    #[error("Refused URL: {0}")]
    Refused(#[from] UrlValidationError),

    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Response too large (limit {limit} bytes)")]
    ResponseTooLarge { limit: usize },

    /// Fewer bytes arrived than Content-Length promised.
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// What came back from a GET, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Performs GET requests on behalf of the icon resolver and the CLI.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed fetcher with a timeout, a body size limit and
/// public-host-only URL validation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Builds a fetcher whose bodies may be at most `max_bytes` long.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig, max_bytes: usize) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .redirect(redirect_policy())
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    /// Fetches without URL validation. Tests use this to reach a local
    /// mock server.
    pub(crate) async fn get_unchecked(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)??;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = read_limited_bytes(response, self.max_bytes).await?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let url = validate_url(url)?;
        self.get_unchecked(url.as_str()).await
    }
}

/// Follows at most a few redirects and refuses loops and hops to
/// internal hosts.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let next = attempt.url().as_str().to_owned();
        if attempt.previous().iter().any(|prev| prev.as_str() == next) {
            return attempt.error("redirect loop");
        }
        if let Err(e) = validate_url(&next) {
            return attempt.error(e);
        }
        tracing::debug!(to = %next, hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

/// Streams the body, stopping as soon as it grows past `limit`.
async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    let expected = response.content_length();
    if expected.is_some_and(|len| len > limit as u64) {
        return Err(FetchError::ResponseTooLarge { limit });
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected {
        if (body.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: body.len(),
            });
        }
    }
    Ok(body)
}
