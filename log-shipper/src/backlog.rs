//! Startup backlog pass.
//!
//! Before any live event is handled, every watched directory is scanned once
//! for log files the manifest has not seen yet. With `--retry_rejected` a
//! second pass re-sends files the server previously rejected.

use crate::fs::find_candidates;
use crate::manifest::manifest_key;
use crate::upload::{UploadOutcome, Uploader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Flags controlling the backlog pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacklogOptions {
    /// Do not upload unhandled files found at startup
    pub skip_backlog: bool,
    /// Re-send files whose names are in the rejected set
    pub retry_rejected: bool,
}

/// Tally of one backlog run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacklogReport {
    pub attempted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub deferred: usize,
}

impl BacklogReport {
    fn record(&mut self, outcome: UploadOutcome) {
        self.attempted += 1;
        match outcome {
            UploadOutcome::Accepted => self.accepted += 1,
            UploadOutcome::Rejected => self.rejected += 1,
            UploadOutcome::Deferred => self.deferred += 1,
        }
    }
}

/// Run the backlog passes over `dirs`, sequentially.
pub async fn run_backlog(dirs: &[PathBuf], options: BacklogOptions, uploader: &Uploader) -> BacklogReport {
    let manifest = uploader.manifest();
    let mut report = BacklogReport::default();

    if !options.skip_backlog {
        info!("Clearing backlog...");
        for dir in dirs {
            for path in list_candidates(dir).await {
                let Some(name) = manifest_key(&path) else { continue };
                if !manifest.is_handled(&name).await {
                    report.record(uploader.upload(&path).await);
                }
            }
        }
    }

    if options.retry_rejected {
        info!("Retrying {} rejected files...", manifest.rejected_count().await);
        for dir in dirs {
            for path in list_candidates(dir).await {
                let Some(name) = manifest_key(&path) else { continue };
                if manifest.is_rejected(&name).await {
                    report.record(uploader.upload(&path).await);
                }
            }
        }
    }

    info!(
        "Backlog cleared ({} attempted: {} accepted, {} rejected, {} deferred)",
        report.attempted, report.accepted, report.rejected, report.deferred
    );
    report
}

/// Candidate files in `dir`; an unreadable directory yields none.
async fn list_candidates(dir: &Path) -> Vec<PathBuf> {
    let dir_owned = dir.to_path_buf();
    let listed = tokio::task::spawn_blocking(move || find_candidates(&dir_owned)).await;

    match listed {
        Ok(Ok(files)) => files,
        Ok(Err(e)) => {
            warn!("Failed to scan {}: {}", dir.display(), e);
            Vec::new()
        }
        Err(e) => {
            warn!("Scan task for {} failed: {}", dir.display(), e);
            Vec::new()
        }
    }
}
