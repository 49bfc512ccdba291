use std::time::Duration;

use clap::Parser;
use error::AppError;
use hlsdl_engine::{
    DownloaderConfig, HlsDownloaderBuilder, ProxyAuth, ProxyConfig, ProxyType, VERSION,
    save_to_file,
};
use indicatif::MultiProgress;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod error;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;
use utils::{default_output_path, parse_headers};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn proxy_from_args(args: &CliArgs) -> Result<Option<ProxyConfig>, AppError> {
    let Some(proxy_url) = args.proxy.as_ref() else {
        return Ok(None);
    };
    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        return Ok(None);
    }

    let proxy_type = args
        .proxy_type
        .parse::<ProxyType>()
        .map_err(AppError::InvalidInput)?;

    // Configure proxy authentication if both username and password are provided
    let auth = match (&args.proxy_user, &args.proxy_pass) {
        (Some(username), Some(password)) => Some(ProxyAuth {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    info!(
        proxy_url = %proxy_url,
        proxy_type = ?proxy_type,
        has_auth = auth.is_some(),
        "Using explicit proxy configuration for downloads"
    );

    Ok(Some(ProxyConfig {
        url: proxy_url.clone(),
        proxy_type,
        auth,
    }))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("hlsdl.log")?;

    let multi_writer = MakeWriterExt::and(std::io::stdout, log_file);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!("hlsdl v{VERSION} - HLS to single container downloader");
    info!("==================================================================");

    let output = match args.output.clone() {
        Some(path) => path,
        None => default_output_path(&args.url)?,
    };

    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, segment={}s",
        args.timeout, args.connect_timeout, args.segment_timeout
    );

    // Create common download configuration
    let download_config = {
        let mut builder = DownloaderConfig::builder()
            .with_timeout(Duration::from_secs(args.timeout))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout))
            .with_headers(parse_headers(&args.headers));

        builder = match proxy_from_args(&args)? {
            Some(proxy) => builder.with_proxy(proxy),
            None => builder.with_system_proxy(!args.no_proxy),
        };
        builder.build()
    };

    // Ctrl-C aborts in-flight downloads; the engine still gets disposed
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling download");
                cancel.cancel();
            }
        });
    }

    // Create a progress manager based on the --no-progress flag
    let multi = MultiProgress::new();
    let progress_manager = if args.no_progress {
        ProgressManager::new_disabled(multi)
    } else {
        ProgressManager::new(multi)
    };
    let sink = progress_manager.clone();

    let downloader = HlsDownloaderBuilder::new()
        .with_base_config(download_config)
        .max_retry(args.max_retry)
        .download_concurrency(args.concurrency as usize)
        .segment_timeout(Duration::from_secs(args.segment_timeout))
        .max_playlist_hops(args.max_hops)
        .ffmpeg_path(args.ffmpeg.clone())
        .with_cancellation(cancel)
        .on_progress(move |event| sink.handle_event(event))
        .build()?;

    info!(url = %args.url, output = %output.display(), "Starting download");
    let data = match downloader.download(&args.url).await {
        Ok(data) => data,
        Err(e) => {
            progress_manager.abandon_unfinished();
            return Err(e.into());
        }
    };

    let path = save_to_file(&data, &output).await?;
    info!(path = %path.display(), bytes = data.len(), "All done");
    Ok(())
}
