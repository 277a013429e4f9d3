//! Polymorphic object storage over a pattern-scanning key-value backend.
//!
//! Records are persisted under a composite key `id::name::kind`, which gives
//! three lookup paths (by id, by name, by kind) using nothing but the
//! backend's glob-style key scan. There is no secondary index.
//!
//! # Components
//!
//! - [`key`]: builds composite keys and scan patterns, extracts segments
//! - [`KindRegistry`]: maps a kind tag back to a concrete record decoder
//! - [`KvObjectStore`]: the [`ObjectDb`] implementation tying both together
//! - [`KvBackend`]: the capability the store needs from a backend
//!
//! # Backends
//!
//! - [`InMemoryBackend`]: `BTreeMap` behind a lock, for tests and embedding
//! - [`FileBackend`]: the same map persisted to a JSON file
//! - [`RetryingBackend`]: bounded exponential-backoff retry around any backend
//!
//! # Rules
//!
//! 1. Validation (`InvalidInput`, `InvalidKeyEncoding`) happens before any backend call.
//! 2. More than one key for an id is an error, never a silent pick.
//! 3. Every backend call honours the caller's [`OpContext`].
//! 4. Backend errors are propagated unchanged inside [`StoreError::Backend`].

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod file;
pub mod key;
pub mod memory;
pub mod registry;
pub mod retry;
pub mod store;

pub use backend::KvBackend;
pub use config::{BackendConfig, StoreConfig};
pub use context::{Canceller, OpContext};
pub use error::{BackendError, BackendResult, StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use registry::KindRegistry;
pub use retry::{RetryConfig, RetryingBackend};
pub use store::{KvObjectStore, ObjectDb};

pub use polykv_types::{Animal, Kind, Person, Record, RecordId, TypedRecord};
