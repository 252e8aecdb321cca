//! Single-slot persistence of the last fetched [`ItemsResult`].
//!
//! The cache is a convenience, not a source of truth: writes are best-effort
//! and reads never fail, they just come back empty.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::ItemsResult;

/// Key of the one slot the widget writes.
pub const CACHE_KEY: &str = "featured-bounty-items";

/// Byte-oriented key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: &[u8]) -> io::Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        (**self).set(key, value)
    }
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        // Rename is atomic on the same filesystem, so readers see old or new.
        fs::rename(&tmp, &path)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.slots.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        let mut slots = self.slots
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        slots.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

pub struct CacheStore<S> {
    store: S,
}

impl<S: KeyValueStore> CacheStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Overwrites the slot. Failures are swallowed.
    pub fn save(&self, items: &ItemsResult) {
        let bytes = match serde_json::to_vec(items) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "skipping cache write, serialization failed");
                return;
            }
        };
        if let Err(err) = self.store.set(CACHE_KEY, &bytes) {
            tracing::debug!(error = %err, "cache write failed");
        }
    }

    pub fn load(&self) -> Option<ItemsResult> {
        let bytes = self.store.get(CACHE_KEY)?;
        match serde_json::from_slice(&bytes) {
            Ok(items) => Some(items),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring unreadable cache entry");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}
