// HLS Playlist Resolver: follows nested playlist pointers until it reaches a
// media playlist.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::hls::HlsError;
use crate::hls::config::HlsPlaylistConfig;
use crate::hls::fetcher::ContentFetcher;
use crate::hls::progress::{ProgressReporter, TaskPhase};
use crate::hls::reference::find_nested_playlist;
use crate::hls::url::{parse_absolute, resolve};

/// The media playlist reached after every nested pointer was followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlaylist {
    pub url: Url,
    pub content: String,
}

pub struct PlaylistResolver {
    fetcher: Arc<dyn ContentFetcher>,
    max_hops: usize,
    progress: ProgressReporter,
}

impl PlaylistResolver {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, config: &HlsPlaylistConfig) -> Self {
        Self {
            fetcher,
            max_hops: config.max_playlist_hops,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches `url` and keeps following the first `.m3u8` reference found in
    /// each response. Playlist fetches are not retried.
    pub async fn resolve(&self, url: Url) -> Result<ResolvedPlaylist, HlsError> {
        self.progress.report(TaskPhase::ParsePlaylist, 0.0);

        let mut current = url;
        let mut hops = 0usize;
        loop {
            let content = self.fetcher.fetch_text(&current).await?;
            let Some(nested) = find_nested_playlist(&content) else {
                info!(url = %current, hops, "Resolved media playlist");
                self.progress.report(TaskPhase::ParsePlaylist, 1.0);
                return Ok(ResolvedPlaylist {
                    url: current,
                    content,
                });
            };

            hops += 1;
            if hops > self.max_hops {
                return Err(HlsError::TooManyRedirects {
                    url: current.to_string(),
                    hops,
                });
            }

            let next = resolve(&current, &nested.text)?;
            debug!(from = %current, to = %next, hop = hops, "Following nested playlist");
            current = next;
        }
    }
}

/// Resolves `url` to its media playlist with the default hop limit.
pub async fn resolve_playlist(
    url: &str,
    fetcher: Arc<dyn ContentFetcher>,
) -> Result<ResolvedPlaylist, HlsError> {
    let url = parse_absolute(url)?;
    PlaylistResolver::new(fetcher, &HlsPlaylistConfig::default())
        .resolve(url)
        .await
}
