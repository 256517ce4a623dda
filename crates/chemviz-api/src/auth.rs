use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Scheme word used in the `Authorization` header.
///
/// The backend uses DRF token auth, so the header is
/// `Authorization: Token <value>` -- not a bearer token.
pub const AUTH_SCHEME: &str = "Token";

/// Every REST endpoint the dashboard talks to.
///
/// Paths are relative to the configured server root (e.g.
/// `http://127.0.0.1:8000`). Dataset-scoped endpoints carry the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api-token-auth/` -- credential exchange.
    TokenAuth,
    /// `GET /api/` -- backend status banner.
    Status,
    /// `GET /api/equipment/` -- paginated, filterable listing.
    Equipment,
    /// `GET /api/equipment/export/csv/` -- filtered CSV download.
    ExportCsv,
    /// `GET /api/datasets/` -- recent datasets with summary stats.
    Datasets,
    /// `GET /api/datasets/{id}/summary/`
    DatasetSummary(u64),
    /// `GET /api/datasets/{id}/report/pdf/`
    DatasetReport(u64),
    /// `POST /api/upload/` -- multipart CSV upload.
    Upload,
}

impl Endpoint {
    /// Path of this endpoint, always with a trailing slash.
    pub fn path(&self) -> String {
        match self {
            Self::TokenAuth => "api-token-auth/".into(),
            Self::Status => "api/".into(),
            Self::Equipment => "api/equipment/".into(),
            Self::ExportCsv => "api/equipment/export/csv/".into(),
            Self::Datasets => "api/datasets/".into(),
            Self::DatasetSummary(id) => format!("api/datasets/{id}/summary/"),
            Self::DatasetReport(id) => format!("api/datasets/{id}/report/pdf/"),
            Self::Upload => "api/upload/".into(),
        }
    }
}

/// Build the `Authorization` header value for a session token.
///
/// The value is marked sensitive so it never shows up in debug output.
pub fn authorization_value(token: &SecretString) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("{AUTH_SCHEME} {}", token.expose_secret()))
        .map_err(|e| Error::Authentication {
            message: format!("invalid token header value: {e}"),
        })?;
    value.set_sensitive(true);
    Ok(value)
}
