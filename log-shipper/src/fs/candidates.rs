//! Candidate log file discovery.
//!
//! The producing application writes to `<name>.log.tmp` and renames the file
//! to `<name>.log` once it is complete, so only the `.log` extension marks a
//! finished file.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Extension of a finished log file.
pub const LOG_EXTENSION: &str = "log";

/// True if `path` names a finished log file.
pub fn is_log_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LOG_EXTENSION)
}

/// Dot-files are skipped, as a shell `*.log` glob would.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// List the finished log files directly inside `dir` (no recursion).
///
/// Symlinks to files are followed. An entry that cannot be read (such as a
/// dangling symlink) is logged and skipped; only failing to read `dir`
/// itself is an error. Results are sorted by path.
///
/// # Example
/// ```no_run
/// use log_shipper::fs::find_candidates;
/// use std::path::Path;
///
/// let logs = find_candidates(Path::new("/var/game/logs")).unwrap();
/// println!("Found {} log files", logs.len());
/// ```
pub fn find_candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        if is_hidden(&entry) || !entry.file_type().is_file() {
            continue;
        }

        if is_log_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
