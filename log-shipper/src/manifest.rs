//! Persistent record of which log files the server has accepted or rejected.
//!
//! The manifest is serialized as `{"accepted": [...], "rejected": [...]}` and
//! rewritten in full after every mutation, so progress survives a crash
//! between two uploads.
//!
//! Entries are keyed by base file name. Two watched directories holding a
//! file with the same name share one entry.

use crate::utils::{Result, ShipperError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// On-disk shape of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestData {
    #[serde(default)]
    pub accepted: BTreeSet<String>,
    #[serde(default)]
    pub rejected: BTreeSet<String>,
}

/// Shared manifest store.
///
/// All reads and writes go through one async mutex, which also covers the
/// file rewrite so concurrent marks never interleave on disk.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    data: Mutex<ManifestData>,
}

/// Manifest key for a candidate file: its base name.
pub fn manifest_key(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

impl Manifest {
    /// Load the manifest at `path`. A missing file yields an empty manifest;
    /// malformed JSON is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<ManifestData>(&content).map_err(|source| {
                ShipperError::MalformedManifest {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                ManifestData::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if `name` was accepted or rejected.
    pub async fn is_handled(&self, name: &str) -> bool {
        let data = self.data.lock().await;
        data.accepted.contains(name) || data.rejected.contains(name)
    }

    pub async fn is_rejected(&self, name: &str) -> bool {
        self.data.lock().await.rejected.contains(name)
    }

    /// Record `name` as accepted and persist.
    ///
    /// A previously rejected name keeps its rejected entry. If the write
    /// fails the in-memory state is left unchanged.
    pub async fn mark_accepted(&self, name: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.accepted.insert(name.to_string());
        persist(&self.path, &next).await?;
        *data = next;
        Ok(())
    }

    /// Record `name` as rejected and persist. If the write fails the
    /// in-memory state is left unchanged.
    pub async fn mark_rejected(&self, name: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.rejected.insert(name.to_string());
        persist(&self.path, &next).await?;
        *data = next;
        Ok(())
    }

    pub async fn accepted_count(&self) -> usize {
        self.data.lock().await.accepted.len()
    }

    pub async fn rejected_count(&self) -> usize {
        self.data.lock().await.rejected.len()
    }

    /// Copy of the current in-memory state.
    pub async fn snapshot(&self) -> ManifestData {
        self.data.lock().await.clone()
    }
}

/// Write `data` to a sibling temp file and rename it over `path`.
async fn persist(path: &Path, data: &ManifestData) -> Result<()> {
    let json = serde_json::to_vec_pretty(data)?;

    let mut tmp_name: OsString = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await?;

    debug!(
        "Saved manifest {} ({} accepted, {} rejected)",
        path.display(),
        data.accepted.len(),
        data.rejected.len()
    );
    Ok(())
}
