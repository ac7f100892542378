//! Client-side key/value storage and the session-token sources built on it.
//!
//! # Design
//! The gateway only ever reads the token. Writing it is the job of the login
//! flow (`AttendanceClient::login`), which is why `TokenSource` has no setter and
//! the gateway holds a `TokenSource` rather than a `Storage`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};

use crate::error::StorageError;

/// Key under which the bearer token is stored.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// String key/value storage.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Storage persisted as a single JSON object file.
///
/// A missing file reads as empty; the file and its parent directory are
/// created on the first write. Every operation re-reads the file, so values
/// written by another process are picked up on the next request.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Read-only source of the session token.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<SecretString>;
}

/// No session: requests go out without an Authorization header.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn token(&self) -> Option<SecretString> {
        None
    }
}

/// A fixed token, mostly for tests and scripts.
#[derive(Debug)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into().into_boxed_str()))
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<SecretString> {
        Some(SecretString::new(self.0.expose_secret().into()))
    }
}

/// Reads the token from `Storage` under `AUTH_TOKEN_KEY` on every call.
///
/// An empty value or a storage read failure counts as no token.
#[derive(Clone)]
pub struct StorageTokenSource {
    storage: Arc<dyn Storage>,
}

impl StorageTokenSource {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

impl TokenSource for StorageTokenSource {
    fn token(&self) -> Option<SecretString> {
        match self.storage.get(AUTH_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                Some(SecretString::new(token.into_boxed_str()))
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("could not read session token: {e}");
                None
            }
        }
    }
}
