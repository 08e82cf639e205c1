//! Log Shipper - Main entry point
//!
//! Drains the backlog of finished log files in each watched directory, then
//! uploads new ones as they are renamed into place until interrupted.

use anyhow::Result;
use clap::Parser;
use log_shipper::backlog::{self, BacklogOptions};
use log_shipper::daemon::ShutdownCoordinator;
use log_shipper::watcher::WatchDispatcher;
use log_shipper::{utils, Config, Manifest, Uploader};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to watch for log files (repeat for several)
    #[arg(long = "path", value_name = "DIR", required = true)]
    paths: Vec<PathBuf>,

    /// Do not upload unhandled log files found at startup
    #[arg(long = "skip_backlog")]
    skip_backlog: bool,

    /// Re-send log files the server previously rejected
    #[arg(long = "retry_rejected")]
    retry_rejected: bool,

    /// Manifest of accepted and rejected files
    #[arg(long, value_name = "FILE", default_value = "manifest.json")]
    manifest: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (.env + environment)
    let config = Config::from_env()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting log-shipper v{}", env!("CARGO_PKG_VERSION"));

    let manifest = Arc::new(Manifest::load(&args.manifest).await?);
    tracing::info!(
        "Loaded manifest {} ({} accepted, {} rejected)",
        manifest.path().display(),
        manifest.accepted_count().await,
        manifest.rejected_count().await
    );

    let uploader = Arc::new(Uploader::new(&config, Arc::clone(&manifest))?);
    tracing::info!("Uploading to {}", uploader.endpoint());

    // Backlog runs to completion before any live event is handled
    let options = BacklogOptions {
        skip_backlog: args.skip_backlog,
        retry_rejected: args.retry_rejected,
    };
    backlog::run_backlog(&args.paths, options, &uploader).await;

    let shutdown = ShutdownCoordinator::new();
    let dispatcher = WatchDispatcher::start(&args.paths, Arc::clone(&uploader), shutdown.token())?;

    shutdown.wait_for_signal().await?;

    dispatcher.join().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_path_is_required() {
        let err = Args::try_parse_from(["log-shipper"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_path_repeats() {
        let args = Args::try_parse_from(["log-shipper", "--path", "/a", "--path", "/b"]).unwrap();
        assert_eq!(args.paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(!args.skip_backlog);
        assert!(!args.retry_rejected);
        assert_eq!(args.manifest, PathBuf::from("manifest.json"));
    }

    #[test]
    fn test_underscore_flags() {
        let args = Args::try_parse_from([
            "log-shipper",
            "--path",
            "/a",
            "--skip_backlog",
            "--retry_rejected",
        ])
        .unwrap();
        assert!(args.skip_backlog);
        assert!(args.retry_rejected);
    }
}
