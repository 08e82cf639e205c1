//! Live directory watching.
//!
//! One non-recursive `notify` watcher is registered per directory. Its
//! callback forwards events over a channel to a tokio task owned by that
//! directory, which uploads every log file renamed into place.
//!
//! Each directory task handles its events one at a time, so a hung upload
//! only stalls its own directory and the number of in-flight uploads never
//! exceeds the number of watched directories. Events arriving meanwhile
//! queue in the channel without limit.

use crate::fs::is_log_file;
use crate::upload::{UploadOutcome, Uploader};
use crate::utils::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Destination path of a rename-into event, if `event` is one.
///
/// inotify reports a rename as `From`, `To` and a paired `Both`; only `To`
/// is taken so a single rename yields a single upload. FSEvents only reports
/// `Any` for both ends, so the path that still exists is the destination.
pub fn rename_target(event: &Event) -> Option<&Path> {
    let path = match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.first(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.first().filter(|p| p.exists())
        }
        _ => None,
    };
    path.map(PathBuf::as_path)
}

/// Upload the file an event finalized, if any.
pub async fn dispatch_event(event: &Event, uploader: &Uploader) -> Option<UploadOutcome> {
    let target = rename_target(event)?;
    if !is_log_file(target) {
        debug!("Ignoring rename to {}", target.display());
        return None;
    }

    info!("A new log file appeared: {}", target.display());
    Some(uploader.upload(target).await)
}

struct DirectoryWatch {
    dir: PathBuf,
    handle: JoinHandle<()>,
}

/// Running set of directory watches.
pub struct WatchDispatcher {
    watches: Vec<DirectoryWatch>,
}

impl WatchDispatcher {
    /// Register a watch on every directory, then start one task per watch.
    ///
    /// Fails without starting anything if any directory cannot be watched.
    pub fn start(dirs: &[PathBuf], uploader: Arc<Uploader>, shutdown: CancellationToken) -> Result<Self> {
        let mut registered = Vec::with_capacity(dirs.len());

        for dir in dirs {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                // Receiver gone means the task is shutting down
                let _ = tx.send(res);
            })?;
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            registered.push((dir.clone(), watcher, rx));
        }

        let watches = registered
            .into_iter()
            .map(|(dir, watcher, rx)| {
                info!("Listening at \"{}\"", dir.display());
                let handle = tokio::spawn(run_watch(
                    dir.clone(),
                    watcher,
                    rx,
                    Arc::clone(&uploader),
                    shutdown.clone(),
                ));
                DirectoryWatch { dir, handle }
            })
            .collect();

        Ok(Self { watches })
    }

    pub(crate) fn len(&self) -> usize {
        self.watches.len()
    }

    /// Wait for every watch task to finish. Call after cancelling.
    pub async fn join(self) {
        for watch in self.watches {
            if let Err(e) = watch.handle.await {
                error!("Watch task for {} failed: {}", watch.dir.display(), e);
            }
        }
    }
}

async fn run_watch(
    dir: PathBuf,
    watcher: RecommendedWatcher,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    uploader: Arc<Uploader>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = events.recv() => match received {
                Some(Ok(event)) => {
                    dispatch_event(&event, &uploader).await;
                }
                Some(Err(e)) => warn!("Watch error in {}: {}", dir.display(), e),
                None => break,
            },
        }
    }

    drop(watcher);
    info!("Stopped watching {}", dir.display());
}
