//! Client-side state for the chemviz equipment dashboard.
//!
//! Sits between `chemviz-api` and a front end (the `chemviz` CLI):
//!
//! - **[`Dashboard`]**: Facade over one shared `ApiClient`. Routes every
//!   auth rejection to [`SessionManager::invalidate`] and clears cached
//!   data when the session goes away.
//!
//! - **[`SessionManager`]**: Token lifecycle: load from a [`TokenStore`]
//!   at startup, login, logout, invalidate. Publishes a [`Session`] with
//!   its [`SessionStatus`] through a `watch` channel.
//!
//! - **[`ListSynchronizer`]**: Paginated listing with opaque cursors.
//!   Last request wins: superseded loads are cancelled and their results
//!   dropped, so out-of-order responses never overwrite newer intent.
//!
//! - **[`MutationOps`]**: Upload, export and report, each with its own
//!   [`OperationState`].
//!
//! Query construction lives in `chemviz_api::ListQuery` and is re-exported
//! here.

pub mod config;
pub mod dashboard;
pub mod datasets;
pub mod error;
pub mod list;
pub mod ops;
pub mod session;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use datasets::DatasetCatalog;
pub use error::CoreError;
pub use list::{ChartSeries, ListSynchronizer, LoadOutcome, Page};
pub use ops::{MutationOps, save_download};
pub use session::{
    FileTokenStore, MemoryTokenStore, Session, SessionManager, SessionStatus, TokenStore,
};
pub use state::{Failure, FailureKind, OperationKind, OperationState};

// Wire types front ends need without depending on chemviz-api directly.
pub use chemviz_api::{
    ApiStatus, DatasetSummary, Download, EquipmentRecord, ListQuery, SortDirection, SortField,
    SortOrder, UploadResponse,
};
