use std::collections::HashMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use super::{MuxEngine, RemuxJob, validate_asset_name};
use crate::hls::HlsError;

/// In-process engine that concatenates MPEG-TS segments in manifest order.
///
/// Storage is a plain map. Encrypted manifests are rejected since this engine
/// performs no decryption.
#[derive(Debug, Default)]
pub struct TsConcatEngine {
    files: HashMap<String, Bytes>,
    loaded: bool,
}

impl TsConcatEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn ensure_loaded(&self) -> Result<(), HlsError> {
        if self.loaded {
            Ok(())
        } else {
            Err(HlsError::EngineLoadFailed("engine is not loaded".to_string()))
        }
    }

    fn manifest(&self, name: &str) -> Result<String, HlsError> {
        let data = self.files.get(name).ok_or_else(|| HlsError::MuxFailed {
            status: None,
            diagnostics: format!("input '{name}' does not exist"),
        })?;
        String::from_utf8(data.to_vec()).map_err(|e| HlsError::MuxFailed {
            status: None,
            diagnostics: format!("input '{name}' is not a text playlist: {e}"),
        })
    }
}

fn is_encrypted(manifest: &str) -> bool {
    manifest
        .lines()
        .filter(|line| line.starts_with("#EXT-X-KEY"))
        .any(|line| !line.contains("METHOD=NONE"))
}

#[async_trait]
impl MuxEngine for TsConcatEngine {
    async fn load(&mut self) -> Result<(), HlsError> {
        self.loaded = true;
        Ok(())
    }

    async fn write_file(&mut self, name: &str, data: Bytes) -> Result<(), HlsError> {
        self.ensure_loaded()?;
        validate_asset_name(name)?;
        self.files.insert(name.to_string(), data);
        Ok(())
    }

    async fn run(&mut self, job: &RemuxJob) -> Result<(), HlsError> {
        self.ensure_loaded()?;
        let manifest = self.manifest(&job.input)?;
        if is_encrypted(&manifest) {
            return Err(HlsError::MuxFailed {
                status: None,
                diagnostics: "encrypted playlists need the ffmpeg engine".to_string(),
            });
        }

        let mut output = BytesMut::new();
        let mut segments = 0usize;
        for line in manifest.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let data = self.files.get(line).ok_or_else(|| HlsError::MuxFailed {
                status: None,
                diagnostics: format!("segment '{line}' referenced by manifest is missing"),
            })?;
            output.extend_from_slice(data);
            segments += 1;
        }

        if segments == 0 {
            return Err(HlsError::MuxFailed {
                status: None,
                diagnostics: format!("'{}' references no segments", job.input),
            });
        }

        debug!(segments, bytes = output.len(), "Concatenated segments");
        validate_asset_name(&job.output)?;
        self.files.insert(job.output.clone(), output.freeze());
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Bytes, HlsError> {
        self.ensure_loaded()?;
        self.files.get(name).cloned().ok_or_else(|| {
            HlsError::storage(
                name,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
            )
        })
    }

    async fn dispose(&mut self) -> Result<(), HlsError> {
        self.files.clear();
        self.loaded = false;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }
}
