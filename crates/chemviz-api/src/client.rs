// HTTP client for the equipment REST API
//
// Wraps `reqwest::Client` with endpoint URL construction, the
// `Authorization: Token` header, status classification, and body
// decoding. Callers get typed models or a classified `Error`; they never
// see raw responses.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{self, Endpoint};
use crate::error::Error;
use crate::models::{
    ApiStatus, DatasetSummary, EquipmentRecord, ErrorBody, Paginated, TokenResponse,
    UploadResponse,
};
use crate::query::ListQuery;
use crate::transport::TransportConfig;

/// Longest body excerpt carried in an error message.
const BODY_PREVIEW: usize = 200;

/// A downloaded file body (CSV export, PDF report).
#[derive(Debug, Clone)]
pub struct Download {
    /// Suggested file name from `Content-Disposition`, or a fallback.
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Download {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Raw HTTP client for the equipment API.
///
/// Holds the current session token (if any) and attaches it to every
/// request. The token itself is owned by the caller's session layer,
/// which pushes changes in through [`set_token`](Self::set_token).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://127.0.0.1:8000`);
    /// every endpoint path is joined onto it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            timeout: transport.timeout,
            token: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            timeout: crate::transport::DEFAULT_TIMEOUT,
            token: RwLock::new(None),
        }
    }

    /// The server root URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Token management ─────────────────────────────────────────────

    /// Replace the token attached to outgoing requests.
    pub fn set_token(&self, token: Option<SecretString>) {
        trace!(present = token.is_some(), "updating session token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Attach `Authorization: Token <value>` when a token is present.
    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => Ok(builder.header(AUTHORIZATION, auth::authorization_value(token)?)),
            None => Ok(builder),
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Full URL for an endpoint.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, Error> {
        Ok(self.base_url.join(&endpoint.path())?)
    }

    /// Listing URL for the first page of `query`.
    pub fn equipment_url(&self, query: &ListQuery) -> Result<Url, Error> {
        let mut url = self.endpoint_url(Endpoint::Equipment)?;
        query.apply_to(&mut url);
        Ok(url)
    }

    /// Export URL carrying the same filters as the listing.
    ///
    /// Ordering is dropped; the export endpoint does not sort.
    pub fn export_url(&self, query: &ListQuery) -> Result<Url, Error> {
        let mut url = self.endpoint_url(Endpoint::ExportCsv)?;
        let unsorted = ListQuery {
            sort: None,
            ..query.clone()
        };
        unsorted.apply_to(&mut url);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Exchange username/password for an API token.
    ///
    /// Any non-2xx reply, or a 2xx reply without a token, is an
    /// `Error::Authentication` carrying the server's reason when it
    /// gave one.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let url = self.endpoint_url(Endpoint::TokenAuth)?;
        debug!("POST {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });
        let resp = self.send(self.http.post(url).json(&body)).await?;

        let status = resp.status();
        let text = self.read_text(resp).await?;
        if !status.is_success() {
            let message = error_reason(&text).unwrap_or_else(|| "Login failed".into());
            return Err(Error::Authentication {
                message: format!("{message} (HTTP {})", status.as_u16()),
            });
        }

        match serde_json::from_str::<TokenResponse>(&text) {
            Ok(TokenResponse { token }) if !token.is_empty() => {
                debug!("login successful");
                Ok(SecretString::from(token))
            }
            _ => Err(Error::Authentication {
                message: "Login failed".into(),
            }),
        }
    }

    /// `GET /api/` -- backend status banner.
    pub async fn status(&self) -> Result<ApiStatus, Error> {
        let url = self.endpoint_url(Endpoint::Status)?;
        self.get_json(url).await
    }

    /// First page of the equipment listing for `query`.
    pub async fn list_equipment(&self, query: &ListQuery) -> Result<Paginated<EquipmentRecord>, Error> {
        let url = self.equipment_url(query)?;
        self.get_json(url).await
    }

    /// Fetch the page behind a `next` / `previous` cursor, verbatim.
    pub async fn fetch_equipment_page(&self, cursor: &Url) -> Result<Paginated<EquipmentRecord>, Error> {
        self.get_json(cursor.clone()).await
    }

    /// All datasets (the server returns the most recent uploads).
    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, Error> {
        let url = self.endpoint_url(Endpoint::Datasets)?;
        self.get_json(url).await
    }

    /// Aggregates for a single dataset.
    pub async fn dataset_summary(&self, id: u64) -> Result<DatasetSummary, Error> {
        let url = self.endpoint_url(Endpoint::DatasetSummary(id))?;
        self.get_json(url).await
    }

    /// Upload a CSV file as multipart field `file`.
    pub async fn upload_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadResponse, Error> {
        let url = self.endpoint_url(Endpoint::Upload)?;
        debug!("POST {url} file={file_name} bytes={}", contents.len());

        let part = Part::bytes(contents)
            .file_name(file_name.to_owned())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let builder = self.apply_auth(self.http.post(url).multipart(form))?;
        let resp = self.check_status(self.send(builder).await?).await?;
        self.decode_json(resp).await
    }

    /// Download the filtered CSV export.
    pub async fn export_csv(&self, query: &ListQuery) -> Result<Download, Error> {
        let url = self.export_url(query)?;
        self.download(url, "equipment_export.csv").await
    }

    /// Download the PDF report for a dataset.
    ///
    /// A 501 reply becomes `Error::CapabilityUnavailable`; 401/403
    /// become `Error::Unauthorized`.
    pub async fn dataset_report(&self, id: u64) -> Result<Download, Error> {
        let url = self.endpoint_url(Endpoint::DatasetReport(id))?;
        self.download(url, &format!("dataset_{id}.pdf")).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let builder = self.apply_auth(self.http.get(url))?;
        let resp = self.check_status(self.send(builder).await?).await?;
        self.decode_json(resp).await
    }

    async fn download(&self, url: Url, fallback_name: &str) -> Result<Download, Error> {
        debug!("GET {url} (download)");
        let builder = self.apply_auth(self.http.get(url))?;
        let resp = self.check_status(self.send(builder).await?).await?;

        let headers = resp.headers();
        let file_name = attachment_file_name(headers).unwrap_or_else(|| fallback_name.to_owned());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;

        debug!(file_name, bytes = bytes.len(), "download complete");
        Ok(Download {
            file_name,
            content_type,
            bytes,
        })
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        builder.send().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout: self.timeout,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Read the whole body, classifying a mid-body timeout like one on send.
    async fn read_text(&self, resp: reqwest::Response) -> Result<String, Error> {
        resp.text().await.map_err(|e| self.classify(e))
    }

    /// Map non-2xx statuses onto the error taxonomy.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body = self.read_text(resp).await?;
        let message = error_reason(&body).unwrap_or_else(|| preview(&body));

        if status == StatusCode::NOT_IMPLEMENTED {
            return Err(Error::CapabilityUnavailable { message });
        }

        Err(Error::Api {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                message
            },
        })
    }

    async fn decode_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let body = self.read_text(resp).await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// Ensure joins append to the base path instead of replacing its last segment.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::reason)
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

/// Extract `filename` from `Content-Disposition: attachment; filename="x"`.
fn attachment_file_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_owned())
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
}
