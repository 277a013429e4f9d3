use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};

/// Key-value capability the object store is built on.
///
/// Implementations must be thread-safe and serialize their own operations.
/// The store performs no locking of its own and relies on nothing beyond
/// these calls:
///
/// - `keys` matches glob-style patterns with `*`, `?` and `[...]`, including
///   two wildcards around one literal (`*::name::*`).
/// - `get` returns `Ok(None)` for a missing key rather than an error.
/// - `delete` returns how many keys were removed.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()>;

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Every key matching the glob `pattern`.
    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>>;

    async fn delete(&self, key: &str) -> BackendResult<u64>;

    /// Liveness check.
    async fn ping(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Remove every key.
    async fn flush_all(&self) -> BackendResult<()>;
}

#[async_trait]
impl<B: KvBackend + ?Sized> KvBackend for Arc<B> {
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        (**self).set(key, value).await
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        (**self).keys(pattern).await
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        (**self).delete(key).await
    }

    async fn ping(&self) -> BackendResult<()> {
        (**self).ping().await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        (**self).flush_all().await
    }
}

/// Compile a scan pattern for backends that match keys locally.
pub fn compile_pattern(pattern: &str) -> BackendResult<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| BackendError::Pattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_span_delimiters() {
        let pattern = compile_pattern("*::alice::*").unwrap();
        assert!(pattern.matches("0192f0c1-7a3e-7cc2-9d1b-5b7f3c2a1e00::alice::Person"));
        assert!(!pattern.matches("0192f0c1-7a3e-7cc2-9d1b-5b7f3c2a1e00::bob::Person"));
    }

    #[test]
    fn prefix_and_suffix_forms() {
        assert!(compile_pattern("abc::*::*").unwrap().matches("abc::x::Animal"));
        assert!(compile_pattern("*::*::Animal").unwrap().matches("abc::x::Animal"));
        assert!(!compile_pattern("*::*::Animal").unwrap().matches("abc::x::Person"));
    }

    #[test]
    fn malformed_pattern_is_reported() {
        let err = compile_pattern("[unclosed").unwrap_err();
        assert!(matches!(err, BackendError::Pattern { .. }));
    }
}
