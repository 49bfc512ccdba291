//! Deterministic fixtures for pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use url::Url;

use crate::hls::HlsError;
use crate::hls::error::FetchCause;
use crate::hls::fetcher::ContentFetcher;
use crate::mux::{MuxEngine, RemuxJob, TsConcatEngine};

#[derive(Debug, Clone)]
pub enum MockResponse {
    Ok(Bytes),
    /// Fails with a retryable error this many times, then succeeds
    FailTimes(usize, Bytes),
    AlwaysFail,
    Status(StatusCode),
    /// Succeeds after sleeping, on top of any fetcher-wide delay
    Delayed(Duration, Bytes),
}

/// In-memory transport keyed by absolute URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    attempts: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay`, so concurrent requests overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert(&self, url: &str, response: MockResponse) {
        self.responses.lock().insert(url.to_string(), response);
    }

    pub fn insert_text(&self, url: &str, text: &str) {
        self.insert(url, MockResponse::Ok(Bytes::from(text.to_string())));
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.lock().get(url).copied().unwrap_or(0)
    }

    /// Every requested URL, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_ending_with(&self, suffix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.ends_with(suffix)).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, HlsError> {
        let key = url.to_string();
        self.calls.lock().push(key.clone());
        let attempt = {
            let mut attempts = self.attempts.lock();
            let counter = attempts.entry(key.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let response = self.responses.lock().get(&key).cloned();
        let delay = match &response {
            Some(MockResponse::Delayed(extra, _)) => self.delay + *extra,
            _ => self.delay,
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Some(MockResponse::Ok(bytes)) | Some(MockResponse::Delayed(_, bytes)) => Ok(bytes),
            Some(MockResponse::FailTimes(n, bytes)) => {
                if attempt <= n {
                    Err(HlsError::fetch_failed(
                        url,
                        FetchCause::Other(format!("transient failure #{attempt}")),
                    ))
                } else {
                    Ok(bytes)
                }
            }
            Some(MockResponse::AlwaysFail) => Err(HlsError::fetch_failed(
                url,
                FetchCause::Other("connection reset".to_string()),
            )),
            Some(MockResponse::Status(status)) => {
                Err(HlsError::fetch_failed(url, FetchCause::Status(status)))
            }
            None => Err(HlsError::fetch_failed(
                url,
                FetchCause::Status(StatusCode::NOT_FOUND),
            )),
        }
    }
}

/// Wraps a [`TsConcatEngine`] and records every call made against it.
#[derive(Default)]
pub struct RecordingEngine {
    inner: TsConcatEngine,
    log: Arc<Mutex<Vec<String>>>,
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_loads: usize,
    fail_run: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared views of the call log and of every written file.
    pub fn handles(&self) -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<HashMap<String, Bytes>>>) {
        (Arc::clone(&self.log), Arc::clone(&self.files))
    }

    pub fn failing_loads(mut self, count: usize) -> Self {
        self.fail_loads = count;
        self
    }

    pub fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }
}

#[async_trait]
impl MuxEngine for RecordingEngine {
    async fn load(&mut self) -> Result<(), HlsError> {
        self.log.lock().push("load".to_string());
        if self.fail_loads > 0 {
            self.fail_loads -= 1;
            return Err(HlsError::EngineLoadFailed("simulated load failure".to_string()));
        }
        self.inner.load().await
    }

    async fn write_file(&mut self, name: &str, data: Bytes) -> Result<(), HlsError> {
        self.log.lock().push(format!("write {name}"));
        self.files.lock().insert(name.to_string(), data.clone());
        self.inner.write_file(name, data).await
    }

    async fn run(&mut self, job: &RemuxJob) -> Result<(), HlsError> {
        self.log.lock().push(format!("run {} -> {}", job.input, job.output));
        if self.fail_run {
            return Err(HlsError::MuxFailed {
                status: Some(1),
                diagnostics: "simulated remux failure".to_string(),
            });
        }
        self.inner.run(job).await
    }

    async fn read_file(&mut self, name: &str) -> Result<Bytes, HlsError> {
        self.log.lock().push(format!("read {name}"));
        self.inner.read_file(name).await
    }

    async fn dispose(&mut self) -> Result<(), HlsError> {
        self.log.lock().push("dispose".to_string());
        self.inner.dispose().await
    }

    fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }
}
