//! Persisted generation history
//!
//! The whole list is serialized under a single key and overwritten on every
//! change. There is no schema versioning: a stored value that no longer parses
//! loads as an empty history.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::model::GeneratedImage;

/// Key the history list is stored under
pub const HISTORY_KEY: &str = "visionary_history";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write history: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Minimal string key-value store
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<key>.json` inside a directory
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read stored value");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct HistoryStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Vec<GeneratedImage> {
        let Some(raw) = self.store.get(HISTORY_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "stored history is not parseable, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save(&mut self, history: &[GeneratedImage]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &raw)?;
        tracing::debug!(entries = history.len(), "history saved");
        Ok(())
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}
