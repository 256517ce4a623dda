// ── Core error types ──
//
// User-facing errors from chemviz-core. Consumers never see raw HTTP
// statuses or JSON parse failures; `From<chemviz_api::Error>` folds the
// transport layer into this taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::state::FailureKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local ────────────────────────────────────────────────────────
    /// Rejected before any request was sent.
    #[error("{message}")]
    Validation { message: String },

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Authentication ───────────────────────────────────────────────
    /// Login rejected, or an operation refused for lack of a session.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A protected endpoint rejected the token. The session has been
    /// (or must be) invalidated.
    #[error("Session expired -- please log in again")]
    SessionExpired,

    // ── Network ──────────────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out{}", after_suffix(*.timeout))]
    Timeout { timeout: Option<Duration> },

    // ── Server ───────────────────────────────────────────────────────
    /// Non-2xx response not attributable to auth.
    #[error("Server error{}: {message}", http_suffix(*.status))]
    Server { status: Option<u16>, message: String },

    /// The server explicitly cannot perform this operation (HTTP 501).
    #[error("Not available on this server: {message}")]
    CapabilityUnavailable { message: String },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Which notification bucket this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } | Self::Io { .. } | Self::Config { .. } => {
                FailureKind::Validation
            }
            Self::AuthenticationFailed { .. } | Self::SessionExpired => FailureKind::Auth,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => FailureKind::Network,
            Self::Server { .. } | Self::Internal(_) => FailureKind::Server,
            Self::CapabilityUnavailable { .. } => FailureKind::CapabilityUnavailable,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

fn http_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn after_suffix(timeout: Option<Duration>) -> String {
    timeout.map(|t| format!(" after {t:?}")).unwrap_or_default()
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<chemviz_api::Error> for CoreError {
    fn from(err: chemviz_api::Error) -> Self {
        match err {
            chemviz_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            chemviz_api::Error::Unauthorized { .. } => CoreError::SessionExpired,
            chemviz_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout: None }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            chemviz_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            chemviz_api::Error::Timeout { timeout } => CoreError::Timeout {
                timeout: Some(timeout),
            },
            chemviz_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            chemviz_api::Error::CapabilityUnavailable { message } => {
                CoreError::CapabilityUnavailable { message }
            }
            chemviz_api::Error::Api { status, message } => CoreError::Server {
                status: Some(status),
                message,
            },
            chemviz_api::Error::Deserialization { message, body: _ } => CoreError::Server {
                status: None,
                message: format!("Unexpected response: {message}"),
            },
        }
    }
}
