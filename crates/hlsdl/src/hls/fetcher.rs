// HLS Content Fetcher: raw retrieval of playlists, keys and segments, plus the
// segment retry loop.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::hls::HlsError;
use crate::hls::config::HlsFetcherConfig;
use crate::hls::error::FetchCause;

/// Transport used for every retrieval. Implementations must not retry.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, HlsError>;

    async fn fetch_text(&self, url: &Url) -> Result<String, HlsError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(decode_text(url, &bytes))
    }
}

/// Decodes playlist text, replacing invalid UTF-8 sequences with U+FFFD.
fn decode_text(url: &Url, bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            warn!(url = %url, "Playlist is not valid UTF-8, invalid bytes replaced");
            text
        }
    }
}

pub struct HttpFetcher {
    http_client: Client,
    timeout: Option<Duration>,
}

impl HttpFetcher {
    pub fn new(http_client: Client) -> Self {
        Self {
            http_client,
            timeout: None,
        }
    }

    /// Per-request timeout overriding the client-wide one.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, HlsError> {
        let mut request = self.http_client.get(url.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HlsError::fetch_failed(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HlsError::fetch_failed(url, FetchCause::Status(status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HlsError::fetch_failed(url, e))?;
        debug!(url = %url, len = bytes.len(), "Fetched");
        Ok(bytes)
    }
}

/// Closure type accepted by [`FnFetcher`].
pub type TextFetchFn = Arc<dyn Fn(Url) -> BoxFuture<'static, Result<String, HlsError>> + Send + Sync>;

/// Adapts an async text-returning closure into a [`ContentFetcher`], for
/// callers that bring their own transport for playlist text.
#[derive(Clone)]
pub struct FnFetcher {
    fetch: TextFetchFn,
}

impl FnFetcher {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(Url) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, HlsError>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move |url| fetch(url).boxed()),
        }
    }
}

#[async_trait]
impl ContentFetcher for FnFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, HlsError> {
        self.fetch_text(url).await.map(Bytes::from)
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, HlsError> {
        (self.fetch)(url.clone()).await
    }
}

/// Fetches `url`, retrying retryable failures up to `config.max_retry` extra
/// times with exponential backoff. Returns the last error once the budget is
/// spent.
pub async fn fetch_with_retries(
    fetcher: &dyn ContentFetcher,
    url: &Url,
    config: &HlsFetcherConfig,
) -> Result<Bytes, HlsError> {
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match fetcher.fetch_bytes(url).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempts > config.max_retry => {
                debug!(url = %url, attempts, "Retry budget exhausted");
                return Err(e);
            }
            Err(e) => {
                warn!(url = %url, attempt = attempts, error = %e, "Fetch failed, retrying");
            }
        }

        let delay = config.retry_delay(attempts);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
