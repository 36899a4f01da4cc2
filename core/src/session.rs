//! Session persistence.
//!
//! # Design
//! The client never owns session state; it talks to an injected
//! `SessionStore`. `StorageSessionStore` maps a session onto the two keys of a
//! synchronous key-value storage (the shape of browser and mini-program local
//! storage). Storage write failures are logged and otherwise ignored: the
//! worst outcome is a session that does not survive a restart.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// An authenticated session: bearer token plus the user profile the backend
/// returned at sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Value) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

/// Process-wide session record.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Session>;

    /// Replace the stored session.
    fn set(&self, session: Session);

    /// Remove token and user. A no-op when nothing is stored.
    fn clear(&self);

    /// Stored token, if any. Empty tokens count as absent.
    fn token(&self) -> Option<String> {
        self.get().map(|s| s.token).filter(|t| !t.is_empty())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, session: Session) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    fn clear(&self) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Synchronous string key-value storage.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// The two storage keys a session occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    pub token: &'static str,
    pub user: &'static str,
}

impl StorageKeys {
    pub const MINI_PROGRAM: StorageKeys = StorageKeys {
        token: "token",
        user: "userInfo",
    };

    pub const ADMIN: StorageKeys = StorageKeys {
        token: "admin_token",
        user: "admin_user",
    };
}

/// `SessionStore` over a `KeyValueStorage`. The user profile is stored as
/// JSON text.
#[derive(Debug)]
pub struct StorageSessionStore<S> {
    storage: S,
    keys: StorageKeys,
}

impl<S: KeyValueStorage> StorageSessionStore<S> {
    pub fn new(storage: S, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: KeyValueStorage> SessionStore for StorageSessionStore<S> {
    fn get(&self) -> Option<Session> {
        let token = self.token()?;
        let user = self
            .storage
            .get(self.keys.user)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(Value::Null);
        Some(Session { token, user })
    }

    fn set(&self, session: Session) {
        if let Err(e) = self.storage.set(self.keys.token, &session.token) {
            warn!(key = self.keys.token, error = %e, "failed to persist session token");
        }
        if let Err(e) = self.storage.set(self.keys.user, &session.user.to_string()) {
            warn!(key = self.keys.user, error = %e, "failed to persist session user");
        }
    }

    fn clear(&self) {
        for key in [self.keys.token, self.keys.user] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to remove session key");
            }
        }
    }

    fn token(&self) -> Option<String> {
        self.storage.get(self.keys.token).filter(|t| !t.is_empty())
    }
}

/// Key-value storage persisted as a single JSON object file.
///
/// The file is read once at open and rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStorage {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(io::Error::other)?;
        fs::write(&self.path, raw)
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}
