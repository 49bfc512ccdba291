use crate::hls::{HlsError, TaskPhase};

/// Error returned by [`crate::HlsDownloader`] and the client helpers.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid proxy configuration: {0}")]
    ProxyError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A pipeline stage failed; `phase` names the stage.
    #[error("{phase} failed: {source}")]
    Pipeline {
        phase: TaskPhase,
        #[source]
        source: HlsError,
    },
}

impl DownloadError {
    pub fn pipeline(phase: TaskPhase, source: HlsError) -> Self {
        DownloadError::Pipeline { phase, source }
    }

    /// The pipeline error behind this failure, if any.
    pub fn hls_error(&self) -> Option<&HlsError> {
        match self {
            DownloadError::Pipeline { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<TaskPhase> {
        match self {
            DownloadError::Pipeline { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
