use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::hls::acquisition::SegmentAcquirer;
use crate::hls::config::HlsConfig;
use crate::hls::fetcher::{ContentFetcher, HttpFetcher};
use crate::hls::playlist::{PlaylistResolver, ResolvedPlaylist};
use crate::hls::progress::{OnProgress, ProgressEvent, ProgressReporter, TaskPhase};
use crate::hls::url::parse_absolute;
use crate::hls::HlsError;
use crate::mux::{
    EngineFactory, FfmpegEngine, MANIFEST_ASSET_NAME, MuxEngine, OUTPUT_ASSET_NAME, RemuxJob,
};
use crate::{DownloadError, DownloaderConfig, create_client};

/// Downloads an HLS presentation and remuxes it into a single container.
///
/// Each [`download`](Self::download) call gets its own engine instance from
/// the engine factory, so concurrent calls never share engine storage.
pub struct HlsDownloader {
    config: Arc<HlsConfig>,
    segment_fetcher: Arc<dyn ContentFetcher>,
    playlist_fetcher: Arc<dyn ContentFetcher>,
    engine_factory: EngineFactory,
    on_progress: Option<OnProgress>,
    cancel: CancellationToken,
}

impl HlsDownloader {
    pub fn new(config: HlsConfig) -> Result<Self, DownloadError> {
        HlsDownloaderBuilder::new().with_config(config).build()
    }

    pub fn builder() -> HlsDownloaderBuilder {
        HlsDownloaderBuilder::new()
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    /// Token that aborts in-flight downloads when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the whole pipeline for `url` and returns the container bytes.
    ///
    /// The engine is disposed whether the pipeline succeeds or not.
    pub async fn download(&self, url: &str) -> Result<Bytes, DownloadError> {
        let url = parse_absolute(url)
            .map_err(|e| DownloadError::pipeline(TaskPhase::ParsePlaylist, e))?;
        let start_time = Instant::now();
        let progress = ProgressReporter::new(self.on_progress.clone());
        let mut engine = (self.engine_factory)();

        let result = self.run_pipeline(&url, engine.as_mut(), &progress).await;

        if let Err(e) = engine.dispose().await {
            warn!(error = %e, "Failed to dispose engine");
        }

        match &result {
            Ok(data) => info!(
                url = %url,
                bytes = data.len(),
                elapsed = ?start_time.elapsed(),
                "Download finished"
            ),
            Err(e) => warn!(url = %url, error = %e, "Download failed"),
        }
        result
    }

    async fn run_pipeline(
        &self,
        url: &Url,
        engine: &mut dyn MuxEngine,
        progress: &ProgressReporter,
    ) -> Result<Bytes, DownloadError> {
        self.load_engine(engine, progress)
            .await
            .map_err(|e| DownloadError::pipeline(TaskPhase::LoadEngine, e))?;

        let playlist = self
            .resolve_playlist(url, progress)
            .await
            .map_err(|e| DownloadError::pipeline(TaskPhase::ParsePlaylist, e))?;

        self.ensure_active()
            .map_err(|e| DownloadError::pipeline(TaskPhase::DownloadSegment, e))?;
        let acquired = SegmentAcquirer::new(
            Arc::clone(&self.segment_fetcher),
            Arc::clone(&self.config),
            progress.clone(),
            self.cancel.clone(),
        )
        .acquire(&playlist, engine)
        .await
        .map_err(|e| DownloadError::pipeline(TaskPhase::DownloadSegment, e))?;
        debug!(
            segments = acquired.segment_count,
            key = acquired.key_written,
            "Playlist assets stored"
        );

        self.merge(engine, acquired.manifest, progress)
            .await
            .map_err(|e| DownloadError::pipeline(TaskPhase::Merge, e))
    }

    fn ensure_active(&self) -> Result<(), HlsError> {
        if self.cancel.is_cancelled() {
            Err(HlsError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn load_engine(
        &self,
        engine: &mut dyn MuxEngine,
        progress: &ProgressReporter,
    ) -> Result<(), HlsError> {
        self.ensure_active()?;
        progress.report(TaskPhase::LoadEngine, 0.0);

        let attempts = self.config.mux_config.load_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match engine.load().await {
                Ok(()) => break,
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "Engine load failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        progress.report(TaskPhase::LoadEngine, 1.0);
        Ok(())
    }

    async fn resolve_playlist(
        &self,
        url: &Url,
        progress: &ProgressReporter,
    ) -> Result<ResolvedPlaylist, HlsError> {
        self.ensure_active()?;
        let resolver = PlaylistResolver::new(
            Arc::clone(&self.playlist_fetcher),
            &self.config.playlist_config,
        )
        .with_progress(progress.clone());

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HlsError::Cancelled),
            result = resolver.resolve(url.clone()) => result,
        }
    }

    async fn merge(
        &self,
        engine: &mut dyn MuxEngine,
        manifest: String,
        progress: &ProgressReporter,
    ) -> Result<Bytes, HlsError> {
        self.ensure_active()?;
        engine
            .write_file(MANIFEST_ASSET_NAME, Bytes::from(manifest))
            .await?;

        progress.report(TaskPhase::Merge, 0.0);
        let job = RemuxJob::stream_copy(MANIFEST_ASSET_NAME, OUTPUT_ASSET_NAME);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(HlsError::Cancelled),
            result = engine.run(&job) => result?,
        }

        let output = engine.read_file(OUTPUT_ASSET_NAME).await?;
        if output.is_empty() {
            return Err(HlsError::MuxFailed {
                status: None,
                diagnostics: format!("{OUTPUT_ASSET_NAME} is empty"),
            });
        }
        progress.report(TaskPhase::Merge, 1.0);
        Ok(output)
    }
}

/// Writes the container to `path`, creating missing parent directories.
pub async fn save_to_file(data: &[u8], path: impl AsRef<Path>) -> Result<PathBuf, DownloadError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    info!(path = %path.display(), bytes = data.len(), "Saved output");
    Ok(path.to_path_buf())
}

/// Fluent setup for [`HlsDownloader`].
pub struct HlsDownloaderBuilder {
    config: HlsConfig,
    segment_fetcher: Option<Arc<dyn ContentFetcher>>,
    playlist_fetcher: Option<Arc<dyn ContentFetcher>>,
    engine_factory: Option<EngineFactory>,
    on_progress: Option<OnProgress>,
    cancel: Option<CancellationToken>,
}

impl HlsDownloaderBuilder {
    pub fn new() -> Self {
        Self {
            config: HlsConfig::default(),
            segment_fetcher: None,
            playlist_fetcher: None,
            engine_factory: None,
            on_progress: None,
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: HlsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_base_config(mut self, base_config: DownloaderConfig) -> Self {
        self.config.base = base_config;
        self
    }

    // --- Pipeline knobs ---

    /// Extra attempts per segment after its first failure
    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.config.fetcher_config.max_retry = max_retry;
        self
    }

    pub fn retry_delay_base(mut self, delay: Duration) -> Self {
        self.config.fetcher_config.retry_delay_base = delay;
        self
    }

    pub fn segment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetcher_config.segment_download_timeout = timeout;
        self
    }

    /// Maximum number of segment fetches in flight
    pub fn download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scheduler_config.download_concurrency = concurrency;
        self
    }

    pub fn max_playlist_hops(mut self, hops: usize) -> Self {
        self.config.playlist_config.max_playlist_hops = hops;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mux_config.ffmpeg_path = path.into();
        self
    }

    pub fn engine_load_retries(mut self, retries: u32) -> Self {
        self.config.mux_config.load_retries = retries;
        self
    }

    // --- Collaborators ---

    /// Transport for keys and segments. Also used for playlists unless
    /// [`with_playlist_fetcher`](Self::with_playlist_fetcher) is set.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.segment_fetcher = Some(fetcher);
        self
    }

    pub fn with_playlist_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.playlist_fetcher = Some(fetcher);
        self
    }

    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<HlsDownloader, DownloadError> {
        self.config.validate().map_err(DownloadError::ConfigError)?;

        let (segment_fetcher, default_playlist_fetcher) = match self.segment_fetcher {
            Some(fetcher) => (Arc::clone(&fetcher), fetcher),
            None => {
                let client = create_client(&self.config.base)?;
                let segments: Arc<dyn ContentFetcher> = Arc::new(
                    HttpFetcher::new(client.clone())
                        .with_timeout(self.config.fetcher_config.segment_download_timeout),
                );
                let playlists: Arc<dyn ContentFetcher> = Arc::new(
                    HttpFetcher::new(client)
                        .with_timeout(self.config.playlist_config.playlist_fetch_timeout),
                );
                (segments, playlists)
            }
        };
        let playlist_fetcher = self.playlist_fetcher.unwrap_or(default_playlist_fetcher);

        let engine_factory = match self.engine_factory {
            Some(factory) => factory,
            None => {
                let mux_config = self.config.mux_config.clone();
                let factory: EngineFactory = Arc::new(move || -> Box<dyn MuxEngine> {
                    Box::new(FfmpegEngine::new(mux_config.clone()))
                });
                factory
            }
        };

        Ok(HlsDownloader {
            config: Arc::new(self.config),
            segment_fetcher,
            playlist_fetcher,
            engine_factory,
            on_progress: self.on_progress,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for HlsDownloaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
