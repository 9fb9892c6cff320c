//! Session Storage
//!
//! Durable key-value storage for the session. The session occupies three
//! string entries that are always cleared together.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use super::{SessionError, SessionResult};
use crate::models::{TokenPair, UserProfile};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// String key-value storage that survives process restarts
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Write all entries in one step
    fn set_many(&self, entries: &[(&str, &str)]) -> SessionResult<()>;

    /// Remove all keys in one step
    fn remove_many(&self, keys: &[&str]) -> SessionResult<()>;

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        self.set_many(&[(key, value)])
    }
}

// ============================================
// File-backed store
// ============================================

/// JSON-object file; every write replaces the file through a rename
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> SessionResult<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> SessionResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        self.write_map(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> SessionResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        // A corrupt file is replaced rather than blocking the clear
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(SessionError::Serialization(e)) => {
                tracing::warn!(path = ?self.path, error = %e, "Discarding unreadable session file");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        for key in keys {
            map.remove(*key);
        }
        self.write_map(&map)
    }
}

// ============================================
// In-memory store
// ============================================

/// Process-local store, used for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> SessionResult<()> {
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> SessionResult<()> {
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ============================================
// Typed session view
// ============================================

/// The client-held session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<UserProfile>,
}

/// Typed access to the three session entries of a [`KeyValueStore`]
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Read the stored session
    ///
    /// Returns `None` when either token is missing. An unreadable user entry
    /// is an error so the caller can discard the session.
    pub fn load(&self) -> SessionResult<Option<Session>> {
        let access_token = self.backend.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.backend.get(REFRESH_TOKEN_KEY)?;
        let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
            return Ok(None);
        };

        let user = match self.backend.get(USER_KEY)? {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(Some(Session {
            access_token,
            refresh_token,
            user,
        }))
    }

    pub fn access_token(&self) -> SessionResult<Option<String>> {
        self.backend.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> SessionResult<Option<String>> {
        self.backend.get(REFRESH_TOKEN_KEY)
    }

    /// Persist a fresh login
    pub fn save(&self, user: &UserProfile, tokens: &TokenPair) -> SessionResult<()> {
        let user = serde_json::to_string(user)?;
        self.backend.set_many(&[
            (USER_KEY, &user),
            (ACCESS_TOKEN_KEY, &tokens.access),
            (REFRESH_TOKEN_KEY, &tokens.refresh),
        ])
    }

    /// Replace the access token, and the refresh token when it was rotated
    pub fn save_tokens(&self, access: &str, refresh: Option<&str>) -> SessionResult<()> {
        match refresh {
            Some(refresh) => self
                .backend
                .set_many(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)]),
            None => self.backend.set(ACCESS_TOKEN_KEY, access),
        }
    }

    pub fn save_user(&self, user: &UserProfile) -> SessionResult<()> {
        self.backend.set(USER_KEY, &serde_json::to_string(user)?)
    }

    /// Remove all three entries together
    pub fn clear(&self) -> SessionResult<()> {
        self.backend.remove_many(&SESSION_KEYS)
    }
}
