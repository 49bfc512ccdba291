//! Muxing engine contract and implementations.
//!
//! The pipeline only talks to an engine through [`MuxEngine`]: load it, write
//! named buffers into its storage, run a stream-copy remux, read the output
//! back and dispose of it.

mod concat;
mod ffmpeg;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::hls::HlsError;

pub use concat::TsConcatEngine;
pub use ffmpeg::FfmpegEngine;

pub const KEY_ASSET_NAME: &str = "key.key";
pub const MANIFEST_ASSET_NAME: &str = "temp.m3u8";
pub const OUTPUT_ASSET_NAME: &str = "temp.mp4";

/// Storage name of the segment at playback position `index`.
pub fn segment_asset_name(index: usize) -> String {
    format!("seg-{index}.ts")
}

/// Asset names are flat identifiers inside the engine's storage.
pub(crate) fn validate_asset_name(name: &str) -> Result<(), HlsError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(HlsError::storage(
            name,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid asset name"),
        ))
    }
}

/// A stream-copy remux from a manifest to an output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxJob {
    pub input: String,
    pub output: String,
}

impl RemuxJob {
    pub fn stream_copy(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[async_trait]
pub trait MuxEngine: Send {
    async fn load(&mut self) -> Result<(), HlsError>;
    async fn write_file(&mut self, name: &str, data: Bytes) -> Result<(), HlsError>;
    async fn run(&mut self, job: &RemuxJob) -> Result<(), HlsError>;
    async fn read_file(&mut self, name: &str) -> Result<Bytes, HlsError>;
    /// Releases everything the engine holds. Safe to call more than once.
    async fn dispose(&mut self) -> Result<(), HlsError>;
    fn is_loaded(&self) -> bool;
}

/// Creates a fresh engine for each download call.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn MuxEngine> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_asset_names() {
        assert_eq!(segment_asset_name(0), "seg-0.ts");
        assert_eq!(segment_asset_name(17), "seg-17.ts");
    }

    #[test]
    fn test_validate_asset_name() {
        assert!(validate_asset_name("seg-0.ts").is_ok());
        assert!(validate_asset_name(KEY_ASSET_NAME).is_ok());
        assert!(validate_asset_name("../etc/passwd").is_err());
        assert!(validate_asset_name("a\\b").is_err());
        assert!(validate_asset_name("").is_err());
        assert!(validate_asset_name("..").is_err());
    }
}
