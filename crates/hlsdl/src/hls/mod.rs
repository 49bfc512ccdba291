// HLS pipeline: playlist resolution, reference extraction, segment acquisition
// and the top-level downloader.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod hls_downloader;
pub mod playlist;
pub mod progress;
pub mod reference;
pub mod rewrite;
pub mod url;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for easier access
pub use acquisition::{AcquiredPlaylist, SegmentAcquirer};
pub use config::HlsConfig;
pub use error::{FetchCause, HlsError};
pub use fetcher::{ContentFetcher, FnFetcher, HttpFetcher};
pub use hls_downloader::{HlsDownloader, HlsDownloaderBuilder, save_to_file};
pub use playlist::{PlaylistResolver, ResolvedPlaylist, resolve_playlist};
pub use progress::{OnProgress, ProgressEvent, ProgressReporter, TaskPhase};
