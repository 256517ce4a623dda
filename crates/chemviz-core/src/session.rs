// ── Session manager ──
//
// Owns the API token: loads it from durable storage at startup, swaps
// it on login, drops it on logout or when a protected endpoint rejects
// it. The token is pushed into the shared `ApiClient` on every change so
// all outgoing requests see the same value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chemviz_api::ApiClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;

// ── Session ─────────────────────────────────────────────────────────

/// Whether a token is held, and why not when it isn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Never logged in, or logged out.
    #[default]
    Anonymous,
    Authenticated,
    /// The server rejected the token; prompt for re-authentication.
    Expired,
}

/// The current session: an optional token plus its status.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    status: SessionStatus,
}

impl Session {
    fn authenticated(token: SecretString) -> Self {
        Self {
            token: Some(token),
            status: SessionStatus::Authenticated,
        }
    }

    fn empty(status: SessionStatus) -> Self {
        Self {
            token: None,
            status,
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

// ── Durable storage ─────────────────────────────────────────────────

/// Durable home of the session token.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token; `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<SecretString>, CoreError>;
    fn save(&self, token: &SecretString) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: SecretString) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), CoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// On-disk shape: `{"token": "..."}`.
#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// JSON token file, written owner-only on Unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CoreError {
        CoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredToken = serde_json::from_str(&raw).map_err(|e| CoreError::Config {
            message: format!("corrupt token file {}: {e}", self.path.display()),
        })?;
        if stored.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(stored.token)))
    }

    fn save(&self, token: &SecretString) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string(&StoredToken {
            token: token.expose_secret().to_owned(),
        })
        .map_err(|e| CoreError::Internal(format!("cannot encode token: {e}")))?;

        write_private(&self.path, body.as_bytes()).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)
}

// ── SessionManager ──────────────────────────────────────────────────

/// Login/logout/invalidate transitions over a [`TokenStore`].
pub struct SessionManager {
    client: Arc<ApiClient>,
    store: Box<dyn TokenStore>,
    session: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, store: Box<dyn TokenStore>) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            client,
            store,
            session,
        }
    }

    /// Read the persisted token. A missing or unreadable token yields an
    /// anonymous session, never an error.
    pub fn load(&self) -> Session {
        let session = match self.store.load() {
            Ok(Some(token)) => {
                debug!("restored persisted session token");
                Session::authenticated(token)
            }
            Ok(None) => Session::empty(SessionStatus::Anonymous),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session token");
                Session::empty(SessionStatus::Anonymous)
            }
        };
        self.publish(session)
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// Every failure (rejection, network, malformed reply) comes back as
    /// `AuthenticationFailed`; the previous session is left untouched.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session, CoreError> {
        let token = self.client.login(username, password).await.map_err(|e| match e {
            chemviz_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            other => CoreError::AuthenticationFailed {
                message: format!("Login failed: {other}"),
            },
        })?;

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "session token not persisted");
        }
        info!(username, "logged in");
        Ok(self.publish(Session::authenticated(token)))
    }

    /// Drop the token locally and in durable storage.
    pub fn logout(&self) -> Session {
        self.forget();
        info!("logged out");
        self.publish(Session::empty(SessionStatus::Anonymous))
    }

    /// Same as [`logout`](Self::logout), but marks the session expired so
    /// the front end prompts for re-authentication.
    pub fn invalidate(&self) -> Session {
        self.forget();
        warn!("session rejected by server, token dropped");
        self.publish(Session::empty(SessionStatus::Expired))
    }

    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    fn forget(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not remove persisted session token");
        }
    }

    fn publish(&self, session: Session) -> Session {
        self.client.set_token(session.token.clone());
        self.session.send_replace(session.clone());
        session
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use url::Url;

    fn client() -> Arc<ApiClient> {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        Arc::new(ApiClient::new(base, &chemviz_api::TransportConfig::default()).unwrap())
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested/default.token.json"));
        assert!(store.load().unwrap().is_none());

        store.save(&SecretString::from("abc".to_string())).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"token":"abc"}"#);
        assert_eq!(store.load().unwrap().unwrap().expose_secret(), "abc");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("t.json"));
        store.save(&SecretString::from("abc".to_string())).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_loads_as_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, "not json").unwrap();

        let manager = SessionManager::new(client(), Box::new(FileTokenStore::new(&path)));
        let session = manager.load();
        assert!(!session.is_authenticated());
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn load_pushes_token_into_client() {
        let api = client();
        let store = MemoryTokenStore::with_token(SecretString::from("t0k".to_string()));
        let manager = SessionManager::new(Arc::clone(&api), Box::new(store));

        let session = manager.load();
        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert!(api.has_token());
    }

    #[test]
    fn invalidate_clears_token_and_marks_expired() {
        let api = client();
        let manager = SessionManager::new(
            Arc::clone(&api),
            Box::new(MemoryTokenStore::with_token(SecretString::from("t".to_string()))),
        );
        manager.load();
        let mut rx = manager.subscribe();

        let session = manager.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(session.status(), SessionStatus::Expired);
        assert!(!api.has_token());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status(), SessionStatus::Expired);

        // A fresh load finds nothing persisted.
        assert_eq!(manager.load().status(), SessionStatus::Anonymous);
    }

    #[test]
    fn logout_is_anonymous() {
        let manager = SessionManager::new(
            client(),
            Box::new(MemoryTokenStore::with_token(SecretString::from("t".to_string()))),
        );
        manager.load();
        assert_eq!(manager.logout().status(), SessionStatus::Anonymous);
        assert!(!manager.is_authenticated());
    }
}
