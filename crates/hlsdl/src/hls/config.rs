use std::path::PathBuf;
use std::time::Duration;

use crate::DownloaderConfig;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    pub playlist_config: HlsPlaylistConfig,
    pub scheduler_config: HlsSchedulerConfig,
    pub fetcher_config: HlsFetcherConfig,
    pub mux_config: HlsMuxConfig,
}

impl HlsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.scheduler_config.download_concurrency == 0 {
            return Err("download_concurrency must be at least 1".to_string());
        }
        if self.playlist_config.max_playlist_hops == 0 {
            return Err("max_playlist_hops must be at least 1".to_string());
        }
        Ok(())
    }
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    pub playlist_fetch_timeout: Duration,
    /// Upper bound on master -> media pointer hops before giving up
    pub max_playlist_hops: usize,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_fetch_timeout: Duration::from_secs(15),
            max_playlist_hops: 8,
        }
    }
}

// --- Scheduler Configuration ---
#[derive(Debug, Clone)]
pub struct HlsSchedulerConfig {
    pub download_concurrency: usize, // Max concurrent segment downloads
}

impl Default for HlsSchedulerConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 3,
        }
    }
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    pub segment_download_timeout: Duration,
    /// Extra attempts per segment after the first failure
    pub max_retry: u32,
    pub retry_delay_base: Duration, // Base for exponential backoff
    pub max_retry_delay: Duration,
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Duration::from_secs(10),
            max_retry: 3,
            retry_delay_base: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(8),
        }
    }
}

impl HlsFetcherConfig {
    /// Backoff before the attempt following `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay_base
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

// --- Mux Configuration ---
#[derive(Debug, Clone)]
pub struct HlsMuxConfig {
    pub ffmpeg_path: PathBuf,
    /// Appended to the remux command line before the output name
    pub extra_args: Vec<String>,
    /// Extra engine load attempts before giving up
    pub load_retries: u32,
}

impl Default for HlsMuxConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            extra_args: Vec::new(),
            load_retries: 1,
        }
    }
}
