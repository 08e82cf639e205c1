//! Upload client for the ingestion endpoint.
//!
//! Each log is sent as a multipart form to `<api_host>/logs/` with the shared
//! secret in the `secret` field and the file bytes in the `log` field. The
//! response status decides what, if anything, is recorded in the manifest:
//!
//! | Status        | Outcome  | Manifest      |
//! |---------------|----------|---------------|
//! | 201 Created   | Accepted | accepted set  |
//! | 409 Conflict  | Accepted | accepted set  |
//! | 500           | Rejected | rejected set  |
//! | anything else | Deferred | untouched     |
//!
//! There is no retry here. Deferred files are picked up by the next backlog
//! scan, rejected ones by a `--retry_rejected` run.

use crate::config::Config;
use crate::manifest::{manifest_key, Manifest};
use crate::utils::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Ingested now (201) or previously (409)
    Accepted,
    /// Server failed to process the log (500)
    Rejected,
    /// Anything else; nothing is recorded
    Deferred,
}

impl UploadOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::CREATED | StatusCode::CONFLICT => UploadOutcome::Accepted,
            StatusCode::INTERNAL_SERVER_ERROR => UploadOutcome::Rejected,
            _ => UploadOutcome::Deferred,
        }
    }
}

/// Join the configured base URL with the upload route.
pub fn logs_endpoint(api_host: &str) -> String {
    format!("{}/logs/", api_host.trim_end_matches('/'))
}

/// Sends log files and records terminal outcomes in the shared manifest.
pub struct Uploader {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
    manifest: Arc<Manifest>,
}

impl Uploader {
    pub fn new(config: &Config, manifest: Arc<Manifest>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: logs_endpoint(&config.api_host),
            secret: config.api_secret.clone(),
            manifest,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }

    /// Upload one log file and record the outcome.
    ///
    /// Failures never propagate: transport errors and unexpected statuses
    /// come back as [`UploadOutcome::Deferred`].
    pub async fn upload(&self, path: &Path) -> UploadOutcome {
        let Some(name) = manifest_key(path) else {
            warn!("Skipping {}: no file name", path.display());
            return UploadOutcome::Deferred;
        };

        info!("Sending {}...", path.display());

        let status = match self.send(path, &name).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Upload of {} failed, will retry on a later run: {}", path.display(), e);
                return UploadOutcome::Deferred;
            }
        };

        let outcome = UploadOutcome::from_status(status);
        let recorded = match outcome {
            UploadOutcome::Accepted => {
                info!("Log file processed ({}): {}", status.as_u16(), name);
                self.manifest.mark_accepted(&name).await
            }
            UploadOutcome::Rejected => {
                warn!("Log file rejected ({}): {}", status.as_u16(), name);
                self.manifest.mark_rejected(&name).await
            }
            UploadOutcome::Deferred => {
                warn!("Unexpected response ({}) for {}, leaving it for a later run", status.as_u16(), name);
                Ok(())
            }
        };

        if let Err(e) = recorded {
            error!("Failed to save manifest {}: {}", self.manifest.path().display(), e);
        }

        outcome
    }

    async fn send(&self, path: &Path, name: &str) -> Result<StatusCode> {
        let bytes = tokio::fs::read(path).await?;

        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("secret", self.secret.clone())
            .part("log", part);

        let resp = self.client.post(&self.endpoint).multipart(form).send().await?;
        Ok(resp.status())
    }
}
