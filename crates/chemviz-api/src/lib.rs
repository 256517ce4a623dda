// chemviz-api: Async Rust client for the chemical equipment visualizer REST API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod query;
pub mod transport;

pub use auth::{AUTH_SCHEME, Endpoint};
pub use client::{ApiClient, Download};
pub use error::Error;
pub use models::{
    ApiStatus, DatasetSummary, EquipmentRecord, Paginated, TokenResponse, UploadResponse,
    UploadedDataset,
};
pub use query::{ListQuery, SortDirection, SortField, SortOrder};
pub use transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};
