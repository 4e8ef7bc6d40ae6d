//! Persistent client-side credential storage.
//!
//! Mirrors the browser's key/value storage: the client keeps the session
//! token under [`TOKEN_KEY`] and the serialized principal under [`USER_KEY`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::ClientError;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key of the serialized principal.
pub const USER_KEY: &str = "user";

/// Key/value storage for client credentials.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object on disk.
///
/// The file is re-read on every access so separate CLI invocations see each
/// other's writes. A missing file reads as empty.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!(path = %self.path.display(), "Saved client credentials");
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        match self.load() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "Unreadable credential file");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
