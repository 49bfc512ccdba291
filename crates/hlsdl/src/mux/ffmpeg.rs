use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{MuxEngine, RemuxJob, validate_asset_name};
use crate::hls::HlsError;
use crate::hls::config::HlsMuxConfig;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Remuxes through an external `ffmpeg` binary. Assets live in a private
/// scratch directory that exists between `load` and `dispose`.
#[derive(Debug)]
pub struct FfmpegEngine {
    config: HlsMuxConfig,
    workdir: Option<TempDir>,
}

impl FfmpegEngine {
    pub fn new(config: HlsMuxConfig) -> Self {
        Self {
            config,
            workdir: None,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.ffmpeg_path);
        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);
        command.stdin(Stdio::null());
        command
    }

    fn asset_path(&self, name: &str) -> Result<PathBuf, HlsError> {
        validate_asset_name(name)?;
        let dir = self
            .workdir
            .as_ref()
            .ok_or_else(|| HlsError::EngineLoadFailed("engine is not loaded".to_string()))?;
        Ok(dir.path().join(name))
    }

    fn remux_args(&self, job: &RemuxJob) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-allowed_extensions",
            "ALL",
            "-i",
            job.input.as_str(),
            "-c",
            "copy",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.extend(self.config.extra_args.iter().cloned());
        args.push("-y".to_string());
        args.push(job.output.clone());
        args
    }
}

#[async_trait]
impl MuxEngine for FfmpegEngine {
    async fn load(&mut self) -> Result<(), HlsError> {
        if self.workdir.is_some() {
            return Ok(());
        }

        let output = self
            .command()
            .arg("-version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                HlsError::EngineLoadFailed(format!(
                    "cannot start {}: {e}",
                    self.config.ffmpeg_path.display()
                ))
            })?;
        if !output.status.success() {
            return Err(HlsError::EngineLoadFailed(format!(
                "{} -version exited with {}",
                self.config.ffmpeg_path.display(),
                output.status
            )));
        }
        if let Some(version) = String::from_utf8_lossy(&output.stdout).lines().next() {
            debug!(version = %version.trim(), "ffmpeg available");
        }

        let workdir = tempfile::Builder::new()
            .prefix("hlsdl-")
            .tempdir()
            .map_err(|e| HlsError::EngineLoadFailed(format!("cannot create work directory: {e}")))?;
        info!(path = %workdir.path().display(), "Engine loaded");
        self.workdir = Some(workdir);
        Ok(())
    }

    async fn write_file(&mut self, name: &str, data: Bytes) -> Result<(), HlsError> {
        let path = self.asset_path(name)?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| HlsError::storage(name, e))
    }

    async fn run(&mut self, job: &RemuxJob) -> Result<(), HlsError> {
        // Both must be valid flat names inside the work directory.
        self.asset_path(&job.input)?;
        let workdir = self.asset_path(&job.output)?.parent().map(PathBuf::from);

        let args = self.remux_args(job);
        debug!(args = ?args, "Running ffmpeg");
        let mut command = self.command();
        command
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| HlsError::MuxFailed {
            status: None,
            diagnostics: format!("cannot start ffmpeg: {e}"),
        })?;

        if !output.status.success() {
            let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = ?output.status.code(), "ffmpeg remux failed");
            return Err(HlsError::MuxFailed {
                status: output.status.code(),
                diagnostics,
            });
        }
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Bytes, HlsError> {
        let path = self.asset_path(name)?;
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| HlsError::storage(name, e))
    }

    async fn dispose(&mut self) -> Result<(), HlsError> {
        if let Some(workdir) = self.workdir.take() {
            let path = workdir.path().display().to_string();
            workdir.close().map_err(|e| HlsError::storage(path, e))?;
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.workdir.is_some()
    }
}
