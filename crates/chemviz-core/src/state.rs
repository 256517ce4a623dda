// ── Observable operation state ──
//
// One tagged value shared by listing, upload, export and report so a
// front end can render spinners and dismissable notices the same way
// for all of them.

use std::fmt;

use strum::{Display, EnumIter};

use crate::error::CoreError;

/// Which asynchronous operation a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Listing,
    Upload,
    Export,
    Report,
}

/// Failure bucket, used to pick the kind of notice to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    /// Caught locally; nothing was sent.
    Validation,
    /// Login rejected or session invalidated; show a re-auth prompt.
    Auth,
    Network,
    Server,
    /// The server cannot do this at all (HTTP 501).
    CapabilityUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Network and server failures may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Network | FailureKind::Server)
    }
}

impl From<&CoreError> for Failure {
    fn from(err: &CoreError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// `Idle | InFlight | Succeeded(message) | Failed(reason)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationState {
    #[default]
    Idle,
    InFlight,
    Succeeded(String),
    Failed(Failure),
}

impl OperationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::InFlight => f.write_str("in flight"),
            Self::Succeeded(message) => write!(f, "ok: {message}"),
            Self::Failed(failure) => write!(f, "failed ({}): {}", failure.kind, failure.reason),
        }
    }
}
