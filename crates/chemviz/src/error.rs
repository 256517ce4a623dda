//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use chemviz_config::ConfigError;
use chemviz_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UNAVAILABLE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the server at {url}")]
    #[diagnostic(
        code(chemviz::connection_failed),
        help(
            "Check that the API server is running and reachable.\n\
             URL: {url}\n\
             Try: chemviz status --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out{}", after_suffix(*.timeout))]
    #[diagnostic(
        code(chemviz::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { timeout: Option<Duration> },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(chemviz::auth_failed),
        help(
            "Verify your username and password, then run: chemviz login\n\
             Store a password with: chemviz config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Session expired or was rejected by the server")]
    #[diagnostic(
        code(chemviz::session_expired),
        help("The stored token was cleared. Run: chemviz login")
    )]
    SessionExpired,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(chemviz::no_credentials),
        help(
            "Pass --username and enter a password interactively,\n\
             set CHEMVIZ_PASSWORD, or run: chemviz config set-password"
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} not found: {message}")]
    #[diagnostic(
        code(chemviz::not_found),
        help("Run: chemviz {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        message: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(chemviz::unavailable),
        help("The server is missing an optional component for this operation.")
    )]
    CapabilityUnavailable { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(chemviz::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(chemviz::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot access {}", path.display())]
    #[diagnostic(code(chemviz::file_access))]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(chemviz::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: chemviz config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(chemviz::no_config),
        help(
            "Create a profile with: chemviz config init\n\
             Or pass --server / set CHEMVIZ_SERVER.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{message}")]
    #[diagnostic(code(chemviz::config))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn after_suffix(timeout: Option<Duration>) -> String {
    timeout.map(|t| format!(" after {t:?}")).unwrap_or_default()
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::CapabilityUnavailable { .. } => exit_code::UNAVAILABLE,
            Self::Validation { .. } | Self::FileAccess { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Io { path, source } => CliError::FileAccess { path, source },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SessionExpired => CliError::SessionExpired,

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::Timeout { timeout } => CliError::Timeout { timeout },

            CoreError::Server {
                status: Some(404),
                message,
            } => CliError::NotFound {
                resource_type: "Resource".into(),
                message,
                list_command: "datasets list".into(),
            },

            CoreError::Server { status, message } => CliError::ApiError {
                code: status.map_or_else(|| "server".into(), |s| s.to_string()),
                message,
            },

            CoreError::CapabilityUnavailable { message } => {
                CliError::CapabilityUnavailable { message }
            }

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
