// HLS Segment Acquisition: downloads the key and every segment of a media
// playlist into engine storage and rewrites the playlist to point at them.

use std::ops::Range;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::hls::HlsError;
use crate::hls::config::HlsConfig;
use crate::hls::fetcher::{ContentFetcher, fetch_with_retries};
use crate::hls::playlist::ResolvedPlaylist;
use crate::hls::progress::{ProgressReporter, TaskPhase};
use crate::hls::reference::extract_references;
use crate::hls::rewrite::PlaylistRewriter;
use crate::hls::url::resolve;
use crate::mux::{KEY_ASSET_NAME, MuxEngine, segment_asset_name};

/// The rewritten playlist and what was stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredPlaylist {
    /// Playlist text whose references now name local assets
    pub manifest: String,
    pub key_written: bool,
    pub segment_count: usize,
}

struct SegmentJob {
    index: usize,
    url: Url,
    span: Range<usize>,
}

pub struct SegmentAcquirer {
    fetcher: Arc<dyn ContentFetcher>,
    config: Arc<HlsConfig>,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl SegmentAcquirer {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        config: Arc<HlsConfig>,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            config,
            progress,
            cancel,
        }
    }

    pub async fn acquire(
        &self,
        playlist: &ResolvedPlaylist,
        engine: &mut dyn MuxEngine,
    ) -> Result<AcquiredPlaylist, HlsError> {
        let references = extract_references(&playlist.content);
        let mut rewriter = PlaylistRewriter::new(&playlist.content);

        let key_written = match &references.key {
            Some(key) => {
                let url = resolve(&playlist.url, &key.text)?;
                debug!(url = %url, "Fetching key");
                let data = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(HlsError::Cancelled),
                    result = self.fetcher.fetch_bytes(&url) => result?,
                };
                engine.write_file(KEY_ASSET_NAME, data).await?;
                rewriter.replace(key.span.clone(), KEY_ASSET_NAME)?;
                true
            }
            None => false,
        };

        // Resolve everything up front so a bad reference fails before any
        // segment traffic.
        let jobs = references
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                Ok(SegmentJob {
                    index,
                    url: resolve(&playlist.url, &segment.text)?,
                    span: segment.span.clone(),
                })
            })
            .collect::<Result<Vec<_>, HlsError>>()?;

        self.download_segments(&jobs, engine).await?;

        for job in &jobs {
            rewriter.replace(job.span.clone(), &segment_asset_name(job.index))?;
        }

        Ok(AcquiredPlaylist {
            manifest: rewriter.finish(),
            key_written,
            segment_count: jobs.len(),
        })
    }

    async fn download_segments(
        &self,
        jobs: &[SegmentJob],
        engine: &mut dyn MuxEngine,
    ) -> Result<(), HlsError> {
        let total = jobs.len();
        let concurrency = self.config.scheduler_config.download_concurrency.max(1);
        self.progress.report(TaskPhase::DownloadSegment, 0.0);
        if total == 0 {
            self.progress.report(TaskPhase::DownloadSegment, 1.0);
            return Ok(());
        }
        info!(segments = total, concurrency, "Downloading segments");

        let mut in_flight = FuturesUnordered::new();
        let mut queued = jobs.iter();
        let mut completed = 0usize;

        while completed < total {
            while in_flight.len() < concurrency {
                let Some(job) = queued.next() else {
                    break;
                };
                let fetcher = Arc::clone(&self.fetcher);
                let config = Arc::clone(&self.config);
                let (index, url) = (job.index, job.url.clone());
                in_flight.push(async move {
                    let result =
                        fetch_with_retries(fetcher.as_ref(), &url, &config.fetcher_config).await;
                    (index, url, result)
                });
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!(completed, total, "Segment download cancelled");
                    return Err(HlsError::Cancelled);
                }

                Some((index, url, result)) = in_flight.next() => {
                    let data = result.map_err(|e| {
                        warn!(index, url = %url, error = %e, "Segment download failed");
                        HlsError::SegmentDownloadFailed {
                            index,
                            url: url.to_string(),
                            last_error: Box::new(e),
                        }
                    })?;
                    debug!(index, len = data.len(), "Segment downloaded");
                    engine.write_file(&segment_asset_name(index), data).await?;

                    completed += 1;
                    self.progress
                        .report(TaskPhase::DownloadSegment, completed as f64 / total as f64);
                }
            }
        }

        Ok(())
    }
}
