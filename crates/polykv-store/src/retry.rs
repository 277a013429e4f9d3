use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::KvBackend;
use crate::error::BackendResult;

/// Retry policy for transient backend errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 50,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

/// Backend wrapper that retries transient failures with exponential backoff.
///
/// Only [`BackendError::Unavailable`](crate::BackendError::Unavailable) is
/// retried; every other error is returned on first sight.
pub struct RetryingBackend<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: KvBackend> RetryingBackend<B> {
    pub fn new(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> BackendResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = BackendResult<T>> + Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.delay(attempt);
                    warn!(op, attempt = attempt + 1, ?delay, error = %e, "transient backend error; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<B: KvBackend> KvBackend for RetryingBackend<B> {
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        self.with_retry("set", move || self.inner.set(key, value.clone()))
            .await
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.with_retry("get", move || self.inner.get(key)).await
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        self.with_retry("keys", move || self.inner.keys(pattern)).await
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        self.with_retry("delete", move || self.inner.delete(key)).await
    }

    async fn ping(&self) -> BackendResult<()> {
        self.with_retry("ping", move || self.inner.ping()).await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        self.with_retry("flush_all", move || self.inner.flush_all()).await
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for RetryingBackend<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingBackend")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish()
    }
}
