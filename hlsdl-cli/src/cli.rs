use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Download an HLS stream into a single MP4 file",
    long_about = "Resolves a master or media playlist, downloads the key and every segment,\n\
                  rewrites the playlist onto the local copies and remuxes them with ffmpeg\n\
                  (stream copy, no re-encoding) into one container."
)]
pub struct CliArgs {
    /// Playlist URL (master or media)
    #[arg(required = true, help = "URL of the master or media playlist")]
    pub url: String,

    /// Output file
    #[arg(
        short,
        long,
        help = "Where to write the container (default: derived from the URL, e.g. stream.mp4)"
    )]
    pub output: Option<PathBuf>,

    /// Segment retry attempts
    #[arg(
        long,
        default_value = "3",
        help = "Extra attempts for a failed segment download before giving up"
    )]
    pub max_retry: u32,

    /// Number of concurrent segment downloads
    #[arg(
        short = 'c',
        long,
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Maximum number of concurrent segment downloads"
    )]
    pub concurrency: u32,

    /// ffmpeg binary
    #[arg(long, default_value = "ffmpeg", help = "Path to the ffmpeg binary used for remuxing")]
    pub ffmpeg: PathBuf,

    /// Nested playlist limit
    #[arg(
        long,
        default_value = "8",
        help = "Maximum number of nested playlist pointers to follow"
    )]
    pub max_hops: usize,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Overall request timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Overall timeout in seconds for HTTP requests (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Per-segment timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Timeout for individual segment downloads in seconds"
    )]
    pub segment_timeout: u64,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy type (http, https, socks5, all)
    #[arg(
        long,
        default_value = "all",
        help = "Proxy type (http, https, socks5, all)",
        value_parser = ["http", "https", "socks5", "all"]
    )]
    pub proxy_type: String,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    /// Hide progress bars
    #[arg(long, help = "Do not show per-phase progress bars")]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["hlsdl", "https://example.com/master.m3u8"]).unwrap();
        assert_eq!(args.max_retry, 3);
        assert_eq!(args.concurrency, 3);
        assert_eq!(args.max_hops, 8);
        assert_eq!(args.ffmpeg, PathBuf::from("ffmpeg"));
        assert!(args.output.is_none());
        assert!(!args.no_progress);
    }

    #[test]
    fn test_repeated_headers_and_output() {
        let args = CliArgs::try_parse_from([
            "hlsdl",
            "https://example.com/master.m3u8",
            "-o",
            "out/video.mp4",
            "-H",
            "Referer: https://example.com",
            "-H",
            "Cookie: a=b",
            "--concurrency",
            "8",
        ])
        .unwrap();
        assert_eq!(args.output, Some(PathBuf::from("out/video.mp4")));
        assert_eq!(args.headers.len(), 2);
        assert_eq!(args.concurrency, 8);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = CliArgs::try_parse_from([
            "hlsdl",
            "https://example.com/master.m3u8",
            "--concurrency",
            "0",
        ]);
        assert!(result.is_err());
    }
}
