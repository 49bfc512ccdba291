use std::sync::Arc;

use reqwest::StatusCode;

/// Why a single retrieval failed.
#[derive(Debug, thiserror::Error, Clone)]
pub enum FetchCause {
    #[error("HTTP status {0}")]
    Status(StatusCode),
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),
    #[error("{0}")]
    Other(String),
}

impl FetchCause {
    /// Client errors are permanent, except request timeout and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchCause::Status(status) => {
                !status.is_client_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchCause::Network(_) | FetchCause::Other(_) => true,
        }
    }
}

impl From<reqwest::Error> for FetchCause {
    fn from(err: reqwest::Error) -> Self {
        FetchCause::Network(Arc::new(err))
    }
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum HlsError {
    #[error("Failed to fetch {url}: {cause}")]
    FetchFailed {
        url: String,
        #[source]
        cause: FetchCause,
    },
    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },
    #[error("Segment {index} ({url}) failed: {last_error}")]
    SegmentDownloadFailed {
        index: usize,
        url: String,
        #[source]
        last_error: Box<HlsError>,
    },
    #[error("Remux failed (exit status {status:?}): {diagnostics}")]
    MuxFailed {
        status: Option<i32>,
        diagnostics: String,
    },
    #[error("Engine failed to load: {0}")]
    EngineLoadFailed(String),
    #[error("Too many nested playlists ({hops}) while resolving {url}")]
    TooManyRedirects { url: String, hops: usize },
    #[error("Playlist error: {0}")]
    InvalidPlaylist(String),
    #[error("Storage error for '{name}': {source}")]
    Storage {
        name: String,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("Operation cancelled")]
    Cancelled,
}

impl HlsError {
    pub fn fetch_failed(url: impl ToString, cause: impl Into<FetchCause>) -> Self {
        HlsError::FetchFailed {
            url: url.to_string(),
            cause: cause.into(),
        }
    }

    pub fn storage(name: impl Into<String>, source: std::io::Error) -> Self {
        HlsError::Storage {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    /// Whether a segment fetch that failed with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            HlsError::FetchFailed { cause, .. } => cause.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let server_error = HlsError::fetch_failed("http://a/seg.ts", FetchCause::Status(StatusCode::BAD_GATEWAY));
        let not_found = HlsError::fetch_failed("http://a/seg.ts", FetchCause::Status(StatusCode::NOT_FOUND));
        let throttled = HlsError::fetch_failed("http://a/seg.ts", FetchCause::Status(StatusCode::TOO_MANY_REQUESTS));

        assert!(server_error.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!HlsError::Cancelled.is_retryable());
        assert!(
            !HlsError::InvalidReference {
                reference: "::".to_string(),
                reason: "bad".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_segment_failure_message_carries_context() {
        let err = HlsError::SegmentDownloadFailed {
            index: 4,
            url: "http://a/seg4.ts".to_string(),
            last_error: Box::new(HlsError::fetch_failed(
                "http://a/seg4.ts",
                FetchCause::Other("connection reset".to_string()),
            )),
        };
        let msg = err.to_string();
        assert!(msg.contains("Segment 4"));
        assert!(msg.contains("connection reset"));
    }
}
