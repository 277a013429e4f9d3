use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::backend::{compile_pattern, KvBackend};
use crate::error::{BackendError, BackendResult};

/// In-memory, `BTreeMap`-based key-value backend.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock` and
/// cloned on read. Scans walk every key, as a real `KEYS` scan does.
pub struct InMemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_map(&self) -> BackendResult<RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| BackendError::Corrupt("lock poisoned".into()))
    }

    fn write_map(&self) -> BackendResult<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| BackendError::Corrupt("lock poisoned".into()))
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> BackendResult<usize> {
        Ok(self.read_map()?.len())
    }

    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Every stored key, sorted.
    pub fn all_keys(&self) -> BackendResult<Vec<String>> {
        Ok(self.read_map()?.keys().cloned().collect())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        self.write_map()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        let map = self.read_map()?;
        Ok(map
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        Ok(u64::from(self.write_map()?.remove(key).is_some()))
    }

    async fn flush_all(&self) -> BackendResult<()> {
        self.write_map()?.clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("key_count", &self.len().ok())
            .finish()
    }
}
