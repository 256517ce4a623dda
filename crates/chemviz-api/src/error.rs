use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `chemviz-api` crate.
///
/// Covers every failure mode of the REST surface: credential exchange,
/// auth rejection, transport, server errors, and decoding.
/// `chemviz-core` maps these into its user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (bad credentials, inactive account, malformed reply).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A protected endpoint answered 401/403 -- the token is missing,
    /// expired, or revoked.
    #[error("Not authorized (HTTP {status}) -- login required")]
    Unauthorized { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// The server explicitly cannot perform this operation (HTTP 501).
    #[error("Not available on this server: {message}")]
    CapabilityUnavailable { message: String },

    /// Any other non-2xx response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server rejected the session token.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
