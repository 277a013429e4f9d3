use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::KvBackend;
use crate::error::{StoreError, StoreResult};
use crate::file::FileBackend;
use crate::memory::InMemoryBackend;
use crate::retry::{RetryConfig, RetryingBackend};

/// Switches the backend to a file at this path.
pub const ENV_DATA_PATH: &str = "POLYKV_DATA_PATH";
/// Per-operation timeout in milliseconds.
pub const ENV_OP_TIMEOUT_MS: &str = "POLYKV_OP_TIMEOUT_MS";

/// Which key-value backend to open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    #[default]
    Memory,
    File {
        path: PathBuf,
    },
}

/// Store configuration, usually read from a TOML file.
///
/// ```toml
/// op_timeout_ms = 2000
///
/// [backend]
/// type = "file"
/// path = "polykv.json"
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 50
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub op_timeout_ms: Option<u64>,
    pub retry: RetryConfig,
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `POLYKV_*` overrides from a variable lookup, usually
    /// `|key| std::env::var(key).ok()`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        if let Some(path) = lookup(ENV_DATA_PATH).filter(|p| !p.is_empty()) {
            self.backend = BackendConfig::File { path: path.into() };
        }
        if let Some(raw) = lookup(ENV_OP_TIMEOUT_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                StoreError::Config(format!("{ENV_OP_TIMEOUT_MS}={raw:?}: {e}"))
            })?;
            self.op_timeout_ms = Some(ms);
        }
        Ok(self)
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout_ms.map(Duration::from_millis)
    }

    /// Open the configured backend, wrapped in retries when enabled.
    pub fn open_backend(&self) -> StoreResult<Arc<dyn KvBackend>> {
        let backend: Arc<dyn KvBackend> = match &self.backend {
            BackendConfig::Memory => Arc::new(InMemoryBackend::new()),
            BackendConfig::File { path } => Arc::new(FileBackend::open(path)?),
        };
        if self.retry.max_retries == 0 {
            return Ok(backend);
        }
        Ok(Arc::new(RetryingBackend::new(backend, self.retry.clone())))
    }
}
