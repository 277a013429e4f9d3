use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::{compile_pattern, KvBackend};
use crate::error::{BackendError, BackendResult};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk document: values are hex-encoded so arbitrary bytes survive.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Key-value backend persisted to a single JSON file.
///
/// The whole map is kept in memory and every mutation rewrites the file
/// through a temp file in the same directory followed by a rename, so a
/// crash leaves either the old or the new document. A failed write rolls the
/// in-memory change back.
///
/// The write and fsync run on the blocking pool while the map's write lock
/// is held, so mutations are serialized with their own persistence and
/// readers wait for the file to catch up.
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl FileBackend {
    /// Open the backend at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> BackendResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            load(&path)?
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), entries = entries.len(), "file backend opened");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, map: &BTreeMap<String, Vec<u8>>) -> BackendResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries: map
                .iter()
                .map(|(k, v)| (k.clone(), hex::encode(v)))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| BackendError::Corrupt(e.to_string()))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| BackendError::Io(std::io::Error::other(e)))??;
        debug!(path = %self.path.display(), entries = map.len(), "file backend persisted");
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> BackendResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

fn load(path: &Path) -> BackendResult<BTreeMap<String, Vec<u8>>> {
    let bytes = std::fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| BackendError::Corrupt(format!("{}: {e}", path.display())))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(BackendError::Corrupt(format!(
            "{}: unsupported snapshot version {}",
            path.display(),
            snapshot.version
        )));
    }
    snapshot
        .entries
        .into_iter()
        .map(|(k, v)| {
            hex::decode(&v)
                .map(|bytes| (k.clone(), bytes))
                .map_err(|e| BackendError::Corrupt(format!("value for {k:?}: {e}")))
        })
        .collect()
}

#[async_trait]
impl KvBackend for FileBackend {
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        let mut map = self.entries.write().await;
        let previous = map.insert(key.to_string(), value);
        if let Err(e) = self.persist(&map).await {
            match previous {
                Some(old) => map.insert(key.to_string(), old),
                None => map.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        let map = self.entries.read().await;
        Ok(map
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        let mut map = self.entries.write().await;
        let Some(old) = map.remove(key) else {
            return Ok(0);
        };
        if let Err(e) = self.persist(&map).await {
            map.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(1)
    }

    async fn flush_all(&self) -> BackendResult<()> {
        let mut map = self.entries.write().await;
        let old = std::mem::take(&mut *map);
        if let Err(e) = self.persist(&map).await {
            *map = old;
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("db.json")).unwrap();
        assert!(backend.keys("*").await.unwrap().is_empty());
        assert!(!backend.path().exists());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        {
            let backend = FileBackend::open(&path).unwrap();
            backend.set("1::alice::Person", b"{\"name\":\"alice\"}".to_vec()).await.unwrap();
            backend.set("2::rex::Animal", vec![0, 255]).await.unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(
            backend.get("1::alice::Person").await.unwrap().unwrap(),
            b"{\"name\":\"alice\"}"
        );
        assert_eq!(backend.get("2::rex::Animal").await.unwrap().unwrap(), vec![0, 255]);
        assert_eq!(backend.keys("*::*::Animal").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let backend = FileBackend::open(&path).unwrap();
        backend.set("k", vec![1]).await.unwrap();
        assert_eq!(backend.delete("k").await.unwrap(), 1);
        assert_eq!(backend.delete("k").await.unwrap(), 0);

        let reopened = FileBackend::open(&path).unwrap();
        assert!(reopened.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn flush_all_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let backend = FileBackend::open(&path).unwrap();
        backend.set("a", vec![]).await.unwrap();
        backend.flush_all().await.unwrap();

        let reopened = FileBackend::open(&path).unwrap();
        assert!(reopened.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_set_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let backend = FileBackend::open(blocker.join("db.json")).unwrap();
        assert!(backend.set("k", vec![1]).await.is_err());
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_and_flush_keep_entries() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let backend = FileBackend::open(data_dir.join("db.json")).unwrap();
        backend.set("k", vec![1]).await.unwrap();
        backend.set("k", vec![2]).await.unwrap();

        // Swap the directory for a regular file so every later write fails.
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, b"not a directory").unwrap();

        assert!(backend.set("k", vec![3]).await.is_err());
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![2]));

        assert!(backend.delete("k").await.is_err());
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![2]));

        assert!(backend.flush_all().await.is_err());
        assert_eq!(backend.keys("*").await.unwrap(), vec!["k"]);
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, b"not json").unwrap();
        let err = FileBackend::open(&path).unwrap_err();
        assert!(matches!(err, BackendError::Corrupt(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, br#"{"version":9,"entries":{}}"#).unwrap();
        assert!(matches!(
            FileBackend::open(&path),
            Err(BackendError::Corrupt(_))
        ));
    }
}
