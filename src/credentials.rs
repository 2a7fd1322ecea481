//! Durable credential storage.
//!
//! A persisted session is a `{token, user}` pair kept under two fixed keys.
//! The pair is written together and cleared together; the token is the
//! source of truth for "is there a session to try and resume". The store
//! itself is a black box to the rest of the crate — only this module knows
//! the on-disk layout.

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::UserSummary;

/// Storage key for the raw bearer token.
const TOKEN_KEY: &str = "portal_token";
/// Storage key for the JSON-serialized user snapshot.
const USER_KEY: &str = "portal_user";

/// Error from the durable store.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents invalid: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable `{token, user}` storage behind the session layer.
///
/// Each mutation writes or clears both keys as one unit. Implementations
/// must never leave the pair mismatched (token without user or vice versa),
/// except that `user` may be absent while a token is retained during
/// server-unavailable hydration — which is why reads are per-key.
pub trait CredentialStore: Send + Sync {
    /// The persisted bearer token, if any.
    fn token(&self) -> Option<String>;

    /// The persisted user snapshot, if any.
    fn user(&self) -> Option<UserSummary>;

    /// Persist the pair (overwrites any previous session).
    fn save(&self, token: &str, user: &UserSummary) -> Result<(), CredentialStoreError>;

    /// Remove both keys. Succeeds when nothing is stored.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// File-backed store: one JSON document holding the two keys.
///
/// Writes are serialized by a process-local mutex and performed as a whole-
/// file rewrite. Concurrent writers in *other* processes are not coordinated;
/// that gap is inherited from the storage model and deliberately left open.
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_document(&self) -> Map<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Map::new(); // No store file yet
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "Credential store unreadable, treating as empty");
                Map::new()
            }
        }
    }

    fn write_document(&self, doc: &Map<String, Value>) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(doc.clone()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn token(&self) -> Option<String> {
        self.read_document()
            .get(TOKEN_KEY)?
            .as_str()
            .map(String::from)
    }

    fn user(&self) -> Option<UserSummary> {
        let value = self.read_document().remove(USER_KEY)?;
        serde_json::from_value(value).ok()
    }

    fn save(&self, token: &str, user: &UserSummary) -> Result<(), CredentialStoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut doc = self.read_document();
        doc.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        doc.insert(USER_KEY.to_string(), serde_json::to_value(user)?);
        self.write_document(&doc)
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut doc = self.read_document();
        doc.remove(TOKEN_KEY);
        doc.remove(USER_KEY);
        self.write_document(&doc)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    token: Option<String>,
    user: Option<UserSummary>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted session, as if a previous run had logged in.
    pub fn with_session(token: &str, user: &UserSummary) -> Self {
        let store = Self::new();
        store.save(token, user).expect("memory save is infallible");
        store
    }

    /// Seed a token with no cached user snapshot (pre-hydration state).
    pub fn with_token_only(token: &str) -> Self {
        let store = Self::new();
        store.inner.lock().expect("store lock poisoned").token = Some(token.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.inner.lock().expect("store lock poisoned").token.clone()
    }

    fn user(&self) -> Option<UserSummary> {
        self.inner.lock().expect("store lock poisoned").user.clone()
    }

    fn save(&self, token: &str, user: &UserSummary) -> Result<(), CredentialStoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.token = Some(token.to_string());
        inner.user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.token = None;
        inner.user = None;
        Ok(())
    }
}
