// ── Runtime dashboard configuration ──
//
// Describes *where* the equipment API lives and how to talk to it.
// Never touches disk: the CLI resolves profiles and hands one of these in.

use std::path::PathBuf;
use std::time::Duration;

use chemviz_api::{TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Configuration for one dashboard instance against one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Server root (e.g. `http://127.0.0.1:8000`). Every endpoint is relative to it.
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Refuse to upload without a session token.
    pub require_auth_for_upload: bool,
}

impl DashboardConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: chemviz_api::transport::DEFAULT_TIMEOUT,
            require_auth_for_upload: true,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
