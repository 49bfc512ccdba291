//! # hlsdl-engine
//!
//! Downloads an HLS presentation (master or media playlist) and remuxes it
//! into a single container.
//!
//! ## Features
//!
//! - Nested playlist resolution with a hop limit
//! - Key and segment acquisition with bounded concurrency and per-segment retry
//! - Span-based playlist rewriting onto local asset names
//! - Pluggable transport and muxing engine (ffmpeg by default)
//! - Per-phase progress reporting and cancellation

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod hls;
pub mod mux;
pub mod proxy;

pub use builder::DownloaderConfigBuilder;
pub use client::create_client;
pub use config::DownloaderConfig;
pub use error::DownloadError;

// Re-export the pipeline entry points
pub use hls::{
    ContentFetcher, HlsConfig, HlsDownloader, HlsDownloaderBuilder, HlsError, OnProgress,
    ProgressEvent, TaskPhase, resolve_playlist, save_to_file,
};
pub use mux::{EngineFactory, FfmpegEngine, MuxEngine, RemuxJob, TsConcatEngine};

// Re-export proxy utilities
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
