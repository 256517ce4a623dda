// ── Mutation operations ──
//
// Upload, export and report. Each runs independently of the listing and
// publishes its own `OperationState`; none of them touches the session
// directly. Auth rejections come back as `CoreError::SessionExpired` for
// the dashboard to route.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chemviz_api::{ApiClient, Download, ListQuery, UploadResponse};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::state::{Failure, FailureKind, OperationKind, OperationState};

const FALLBACK_UPLOAD_NAME: &str = "upload.csv";

pub struct MutationOps {
    client: Arc<ApiClient>,
    require_auth_for_upload: bool,
    upload: watch::Sender<OperationState>,
    export: watch::Sender<OperationState>,
    report: watch::Sender<OperationState>,
}

impl MutationOps {
    pub fn new(client: Arc<ApiClient>, require_auth_for_upload: bool) -> Self {
        Self {
            client,
            require_auth_for_upload,
            upload: watch::channel(OperationState::Idle).0,
            export: watch::channel(OperationState::Idle).0,
            report: watch::channel(OperationState::Idle).0,
        }
    }

    fn channel(&self, kind: OperationKind) -> Option<&watch::Sender<OperationState>> {
        match kind {
            OperationKind::Upload => Some(&self.upload),
            OperationKind::Export => Some(&self.export),
            OperationKind::Report => Some(&self.report),
            OperationKind::Listing => None,
        }
    }

    pub fn state(&self, kind: OperationKind) -> OperationState {
        self.channel(kind)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self, kind: OperationKind) -> Option<watch::Receiver<OperationState>> {
        self.channel(kind).map(watch::Sender::subscribe)
    }

    /// Return a finished operation to `Idle`. No effect while in flight.
    pub fn dismiss(&self, kind: OperationKind) {
        if let Some(tx) = self.channel(kind) {
            tx.send_if_modified(|state| {
                if state.is_in_flight() || *state == OperationState::Idle {
                    return false;
                }
                *state = OperationState::Idle;
                true
            });
        }
    }

    // ── Upload ──────────────────────────────────────────────────────

    /// Upload a CSV file.
    ///
    /// `None` is rejected locally as a validation failure; so is an
    /// unreadable file. With `require_auth_for_upload` set, a missing
    /// token fails locally too. None of these send a request.
    pub async fn upload_csv(&self, file: Option<&Path>) -> Result<UploadResponse, CoreError> {
        let tx = &self.upload;

        let Some(path) = file else {
            return Err(fail(
                tx,
                CoreError::Validation {
                    message: "No file selected".into(),
                },
            ));
        };

        if self.require_auth_for_upload && !self.client.has_token() {
            return Err(fail(
                tx,
                CoreError::AuthenticationFailed {
                    message: "Login required to upload".into(),
                },
            ));
        }

        tx.send_replace(OperationState::InFlight);

        let contents = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(fail(
                    tx,
                    CoreError::Io {
                        path: path.to_path_buf(),
                        source,
                    },
                ));
            }
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(FALLBACK_UPLOAD_NAME);

        debug!(file_name, bytes = contents.len(), "uploading csv");
        match self.client.upload_csv(file_name, contents).await {
            Ok(resp) => {
                info!(created = resp.created, "upload complete");
                tx.send_replace(OperationState::Succeeded(format!(
                    "Uploaded — {} rows",
                    resp.created
                )));
                Ok(resp)
            }
            Err(e) => {
                let err = CoreError::from(e);
                let reason = if err.is_session_expired() {
                    err.to_string()
                } else {
                    format!("Upload failed: {err}")
                };
                tx.send_replace(OperationState::Failed(Failure::new(err.kind(), reason)));
                Err(err)
            }
        }
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Download the CSV export for `query`'s filters.
    pub async fn export_csv(&self, query: &ListQuery) -> Result<Download, CoreError> {
        let tx = &self.export;
        tx.send_replace(OperationState::InFlight);

        match self.client.export_csv(query).await {
            Ok(download) => {
                tx.send_replace(OperationState::Succeeded(format!(
                    "Exported {} ({} bytes)",
                    download.file_name,
                    download.len()
                )));
                Ok(download)
            }
            Err(e) => Err(fail(tx, CoreError::from(e))),
        }
    }

    // ── Report ──────────────────────────────────────────────────────

    /// Download the PDF report for a dataset.
    ///
    /// Success, `CapabilityUnavailable` (server cannot render PDFs) and
    /// `SessionExpired` are distinct outcomes.
    pub async fn download_report(&self, dataset_id: u64) -> Result<Download, CoreError> {
        let tx = &self.report;
        tx.send_replace(OperationState::InFlight);

        match self.client.dataset_report(dataset_id).await {
            Ok(download) => {
                tx.send_replace(OperationState::Succeeded(format!(
                    "Report ready: {}",
                    download.file_name
                )));
                Ok(download)
            }
            Err(e) => {
                let err = CoreError::from(e);
                if let CoreError::CapabilityUnavailable { message } = &err {
                    let reason = format!("The server cannot generate PDF reports ({message})");
                    tx.send_replace(OperationState::Failed(Failure::new(
                        FailureKind::CapabilityUnavailable,
                        reason,
                    )));
                    return Err(err);
                }
                Err(fail(tx, err))
            }
        }
    }
}

fn fail(tx: &watch::Sender<OperationState>, err: CoreError) -> CoreError {
    warn!(error = %err, "operation failed");
    tx.send_replace(OperationState::Failed(Failure::from(&err)));
    err
}

/// Write a download to `dest`. A directory gets the download's own file name.
pub async fn save_download(download: &Download, dest: &Path) -> Result<PathBuf, CoreError> {
    let path = if tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_dir()) {
        dest.join(&download.file_name)
    } else {
        dest.to_path_buf()
    };
    tokio::fs::write(&path, &download.bytes)
        .await
        .map_err(|source| CoreError::Io {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path.display(), bytes = download.len(), "download saved");
    Ok(path)
}
