// ── Dashboard facade ──
//
// Wires the session manager, list synchronizer, dataset catalog and
// mutation operations around one shared `ApiClient`. This is the only
// place an auth rejection turns into a session invalidation: any
// component result carrying `CoreError::SessionExpired` drops the token
// and clears the cached listing before it is handed back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chemviz_api::{ApiClient, ApiStatus, DatasetSummary, Download, ListQuery, UploadResponse};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::DashboardConfig;
use crate::datasets::DatasetCatalog;
use crate::error::CoreError;
use crate::list::{ListSynchronizer, LoadOutcome, Page};
use crate::ops::{self, MutationOps};
use crate::session::{Session, SessionManager, TokenStore};
use crate::state::{OperationKind, OperationState};

/// The main entry point for front ends.
///
/// Cheaply cloneable via `Arc<DashboardInner>`.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: Arc<ApiClient>,
    session: SessionManager,
    list: ListSynchronizer,
    datasets: DatasetCatalog,
    ops: MutationOps,
}

impl Dashboard {
    /// Build a dashboard. Does not touch the network or the token store;
    /// call [`start`](Self::start) or [`restore_session`](Self::restore_session).
    pub fn new(config: DashboardConfig, store: impl TokenStore + 'static) -> Result<Self, CoreError> {
        let client = Arc::new(ApiClient::new(config.base_url.clone(), &config.transport())?);
        Ok(Self {
            inner: Arc::new(DashboardInner {
                session: SessionManager::new(Arc::clone(&client), Box::new(store)),
                list: ListSynchronizer::new(Arc::clone(&client)),
                datasets: DatasetCatalog::new(Arc::clone(&client)),
                ops: MutationOps::new(Arc::clone(&client), config.require_auth_for_upload),
                client,
                config,
            }),
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Load the persisted session only.
    pub fn restore_session(&self) -> Session {
        self.inner.session.load()
    }

    /// Load the persisted session and, when it carries a token, fetch the
    /// first equipment page and the datasets.
    pub async fn start(&self) -> Result<Session, CoreError> {
        let session = self.restore_session();
        if session.is_authenticated() {
            debug!("restored session, loading initial data");
            self.refresh_all().await?;
        }
        Ok(self.session())
    }

    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session, CoreError> {
        self.inner.session.login(username, password).await
    }

    /// Drop the session and every piece of cached data.
    pub fn logout(&self) -> Session {
        let session = self.inner.session.logout();
        self.clear_cached();
        session
    }

    /// Same as logout, but leaves the session marked expired.
    pub fn invalidate(&self) -> Session {
        let session = self.inner.session.invalidate();
        self.clear_cached();
        session
    }

    pub fn session(&self) -> Session {
        self.inner.session.current()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    /// `GET /api/` banner.
    pub async fn server_status(&self) -> Result<ApiStatus, CoreError> {
        let status = self.inner.client.status().await.map_err(CoreError::from);
        self.route(status)
    }

    // ── Listing ─────────────────────────────────────────────────────

    pub async fn apply_query(&self, query: ListQuery) -> Result<LoadOutcome, CoreError> {
        let outcome = self.inner.list.apply_query(query).await;
        self.route(outcome)
    }

    pub async fn next_page(&self) -> Result<LoadOutcome, CoreError> {
        let outcome = self.inner.list.go_next().await;
        self.route(outcome)
    }

    pub async fn previous_page(&self) -> Result<LoadOutcome, CoreError> {
        let outcome = self.inner.list.go_previous().await;
        self.route(outcome)
    }

    /// Re-fetch the first page of the current query.
    pub async fn refresh_list(&self) -> Result<LoadOutcome, CoreError> {
        let outcome = self.inner.list.refresh().await;
        self.route(outcome)
    }

    pub fn query(&self) -> ListQuery {
        self.inner.list.query()
    }

    pub fn page(&self) -> Arc<Page> {
        self.inner.list.page()
    }

    pub fn subscribe_page(&self) -> watch::Receiver<Arc<Page>> {
        self.inner.list.subscribe_page()
    }

    // ── Datasets ────────────────────────────────────────────────────

    pub async fn refresh_datasets(&self) -> Result<Arc<Vec<DatasetSummary>>, CoreError> {
        let datasets = self.inner.datasets.refresh().await;
        self.route(datasets)
    }

    pub fn datasets(&self) -> Arc<Vec<DatasetSummary>> {
        self.inner.datasets.snapshot()
    }

    pub fn subscribe_datasets(&self) -> watch::Receiver<Arc<Vec<DatasetSummary>>> {
        self.inner.datasets.subscribe()
    }

    pub async fn dataset_summary(&self, id: u64) -> Result<DatasetSummary, CoreError> {
        let summary = self.inner.datasets.summary(id).await;
        self.route(summary)
    }

    /// First equipment page for the current query plus the datasets.
    pub async fn refresh_all(&self) -> Result<(), CoreError> {
        let (list, datasets) = tokio::join!(self.refresh_list(), self.refresh_datasets());
        list?;
        datasets?;
        Ok(())
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Upload a CSV and, on success, re-fetch the equipment list (first
    /// page, current query) and the datasets.
    ///
    /// A failed follow-up refresh does not fail the upload; its failure
    /// shows up in the listing state instead.
    pub async fn upload_csv(&self, file: Option<&Path>) -> Result<UploadResponse, CoreError> {
        let uploaded = self.inner.ops.upload_csv(file).await;
        let resp = self.route(uploaded)?;

        if let Err(e) = self.refresh_all().await {
            warn!(error = %e, "refresh after upload failed");
        }
        Ok(resp)
    }

    /// Download the CSV export for `query`'s filters.
    pub async fn export_csv(&self, query: &ListQuery) -> Result<Download, CoreError> {
        let download = self.inner.ops.export_csv(query).await;
        self.route(download)
    }

    /// Export with the filters currently applied to the listing.
    pub async fn export_current(&self) -> Result<Download, CoreError> {
        let query = self.query();
        self.export_csv(&query).await
    }

    /// Export to `dest` (a file, or a directory to receive the server's file name).
    pub async fn export_csv_to(&self, query: &ListQuery, dest: &Path) -> Result<PathBuf, CoreError> {
        let download = self.export_csv(query).await?;
        ops::save_download(&download, dest).await
    }

    pub async fn download_report(&self, dataset_id: u64) -> Result<Download, CoreError> {
        let report = self.inner.ops.download_report(dataset_id).await;
        self.route(report)
    }

    /// Fetch a report and write it to `dest`. Nothing is written unless the
    /// server returned the PDF.
    pub async fn download_report_to(&self, dataset_id: u64, dest: &Path) -> Result<PathBuf, CoreError> {
        let download = self.download_report(dataset_id).await?;
        ops::save_download(&download, dest).await
    }

    // ── Operation state ─────────────────────────────────────────────

    pub fn operation_state(&self, kind: OperationKind) -> OperationState {
        match kind {
            OperationKind::Listing => self.inner.list.state(),
            _ => self.inner.ops.state(kind),
        }
    }

    pub fn subscribe_operation(&self, kind: OperationKind) -> watch::Receiver<OperationState> {
        match self.inner.ops.subscribe(kind) {
            Some(rx) => rx,
            None => self.inner.list.subscribe_state(),
        }
    }

    /// Acknowledge a finished operation's notice.
    pub fn dismiss(&self, kind: OperationKind) {
        match kind {
            OperationKind::Listing => self.inner.list.dismiss(),
            _ => self.inner.ops.dismiss(kind),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn route<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if matches!(&result, Err(e) if e.is_session_expired()) {
            self.invalidate();
        }
        result
    }

    fn clear_cached(&self) {
        self.inner.list.clear();
        self.inner.datasets.clear();
    }
}
