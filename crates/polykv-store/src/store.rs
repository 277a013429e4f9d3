use async_trait::async_trait;
use tracing::{debug, warn};

use polykv_types::{Record, RecordId, TypedRecord};

use crate::backend::KvBackend;
use crate::context::OpContext;
use crate::error::{StoreError, StoreResult};
use crate::key::{self, ScanField};
use crate::registry::KindRegistry;

/// Polymorphic object database.
///
/// Implementations must satisfy these invariants:
/// - Ids are minted by `store`, never by the caller, and are unique.
/// - Argument validation fails before any backend call is made.
/// - A lookup that matches more than one key for one id fails with
///   [`StoreError::AmbiguousId`] instead of picking one.
/// - A batch lookup either returns every matching record or fails; it never
///   returns a partial result after a decode error or cancellation.
#[async_trait]
pub trait ObjectDb: Send + Sync {
    /// Persist `record` under a freshly generated id.
    ///
    /// On success the id is also written into `record`. On failure `record`
    /// is left untouched.
    async fn store(&self, ctx: &OpContext, record: &mut Record) -> StoreResult<RecordId>;

    /// The record stored under `id`.
    async fn get_object_by_id(&self, ctx: &OpContext, id: &str) -> StoreResult<Record>;

    /// Every record named `name`. Names are not unique.
    async fn get_objects_by_name(&self, ctx: &OpContext, name: &str) -> StoreResult<Vec<Record>>;

    /// Every record of the given kind tag.
    async fn list_objects(&self, ctx: &OpContext, kind: &str) -> StoreResult<Vec<Record>>;

    /// Delete the record stored under `id`. Deleting a missing id succeeds.
    async fn delete_object(&self, ctx: &OpContext, id: &str) -> StoreResult<()>;
}

/// [`ObjectDb`] over any [`KvBackend`], using composite keys and pattern scans.
///
/// The store holds no mutable state; concurrent calls may interleave freely.
/// There is no atomicity across the scan and the follow-up fetch or delete,
/// so a concurrent writer can slip in between them.
pub struct KvObjectStore<B> {
    backend: B,
    registry: KindRegistry,
}

impl<B: KvBackend> KvObjectStore<B> {
    /// A store decoding the built-in record kinds.
    pub fn new(backend: B) -> Self {
        Self::with_registry(backend, KindRegistry::builtin())
    }

    pub fn with_registry(backend: B, registry: KindRegistry) -> Self {
        Self { backend, registry }
    }

    /// Create a store after checking that the backend answers.
    pub async fn connect(ctx: &OpContext, backend: B) -> StoreResult<Self> {
        let store = Self::new(backend);
        store.ping(ctx).await?;
        Ok(store)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub async fn ping(&self, ctx: &OpContext) -> StoreResult<()> {
        ctx.run(self.backend.ping()).await
    }

    /// Remove every key from the backend, including keys this store did not write.
    pub async fn flush_all(&self, ctx: &OpContext) -> StoreResult<()> {
        ctx.run(self.backend.flush_all()).await?;
        debug!("backend flushed");
        Ok(())
    }

    /// [`ObjectDb::store`] for a concrete record type.
    pub async fn store_typed<T: TypedRecord>(
        &self,
        ctx: &OpContext,
        record: &mut T,
    ) -> StoreResult<RecordId> {
        let mut wrapped = record.clone().into_record();
        let id = self.store(ctx, &mut wrapped).await?;
        record.set_id(id);
        Ok(id)
    }

    /// Keys whose `field` segment is exactly `literal`, sorted.
    ///
    /// The glob scan alone can over-match when a name has a colon at its edge
    /// (`"a:"` makes the key `id::a:::Kind`, which `*::a::*` also matches), so
    /// every hit is split and compared segment-wise.
    async fn scan(&self, ctx: &OpContext, field: ScanField, literal: &str) -> StoreResult<Vec<String>> {
        let pattern = field.pattern(literal);
        let mut keys = ctx.run(self.backend.keys(&pattern)).await?;
        keys.retain(|k| key::decode(k).is_some_and(|parts| parts.segment(field) == literal));
        keys.sort();
        debug!(%field, %pattern, matches = keys.len(), "pattern scan");
        Ok(keys)
    }

    /// Resolve an id scan to at most one key.
    async fn scan_id(&self, ctx: &OpContext, id: &str) -> StoreResult<Option<String>> {
        let mut keys = self.scan(ctx, ScanField::Id, id).await?;
        if keys.len() > 1 {
            warn!(id, matches = keys.len(), "multiple keys share one id");
            return Err(StoreError::AmbiguousId {
                id: id.to_string(),
                matches: keys.len(),
            });
        }
        Ok(keys.pop())
    }

    /// Fetch and decode the record under `key`.
    ///
    /// Returns `Ok(None)` if the key vanished after it was scanned.
    async fn fetch(&self, ctx: &OpContext, key: &str) -> StoreResult<Option<Record>> {
        let Some(payload) = ctx.run(self.backend.get(key)).await? else {
            return Ok(None);
        };
        let kind = key::kind_of(key).ok_or_else(|| StoreError::InvalidKeyEncoding {
            key: key.to_string(),
        })?;
        let mut record = self
            .registry
            .decode(kind, &payload)
            .inspect_err(|e| warn!(key, error = %e, "failed to decode stored record"))?;
        if record.id().is_none() {
            if let Some(id) = key::id_of(key).and_then(|s| s.parse().ok()) {
                record.set_id(id);
            }
        }
        Ok(Some(record))
    }

    /// Fetch every key in order, aborting on the first failure.
    async fn fetch_all(&self, ctx: &OpContext, keys: &[String]) -> StoreResult<Vec<Record>> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            match self.fetch(ctx, key).await? {
                Some(record) => records.push(record),
                None => debug!(key = key.as_str(), "key vanished between scan and fetch"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl<B: KvBackend> ObjectDb for KvObjectStore<B> {
    async fn store(&self, ctx: &OpContext, record: &mut Record) -> StoreResult<RecordId> {
        let kind = record.kind().as_str();
        if record.name().is_empty() {
            return Err(StoreError::InvalidInput("record name must not be empty".into()));
        }
        if kind.is_empty() {
            return Err(StoreError::InvalidInput("record kind must not be empty".into()));
        }
        if !self.registry.contains(kind) {
            return Err(StoreError::UnknownObjectKind(kind.to_string()));
        }

        let id = RecordId::new();
        let key = key::encode(&id.to_string(), record.name(), kind)?;
        let mut persisted = record.clone();
        persisted.set_id(id);
        let payload = KindRegistry::encode(&persisted)?;

        ctx.run(self.backend.set(&key, payload)).await?;
        debug!(%id, kind, "stored record");
        *record = persisted;
        Ok(id)
    }

    async fn get_object_by_id(&self, ctx: &OpContext, id: &str) -> StoreResult<Record> {
        if id.is_empty() {
            return Err(StoreError::InvalidInput("id must not be empty".into()));
        }
        let not_found = || StoreError::NotFound(id.to_string());
        let key = self.scan_id(ctx, id).await?.ok_or_else(not_found)?;
        self.fetch(ctx, &key).await?.ok_or_else(not_found)
    }

    async fn get_objects_by_name(&self, ctx: &OpContext, name: &str) -> StoreResult<Vec<Record>> {
        if name.is_empty() {
            return Err(StoreError::InvalidInput("name must not be empty".into()));
        }
        let keys = self.scan(ctx, ScanField::Name, name).await?;
        self.fetch_all(ctx, &keys).await
    }

    async fn list_objects(&self, ctx: &OpContext, kind: &str) -> StoreResult<Vec<Record>> {
        if kind.is_empty() {
            return Err(StoreError::InvalidInput("kind must not be empty".into()));
        }
        let keys = self.scan(ctx, ScanField::Kind, kind).await?;
        self.fetch_all(ctx, &keys).await
    }

    async fn delete_object(&self, ctx: &OpContext, id: &str) -> StoreResult<()> {
        if id.is_empty() {
            return Ok(());
        }
        let Some(key) = self.scan_id(ctx, id).await? else {
            debug!(id, "delete of unknown id is a no-op");
            return Ok(());
        };
        let removed = ctx.run(self.backend.delete(&key)).await?;
        debug!(id, removed, "deleted record");
        Ok(())
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for KvObjectStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvObjectStore")
            .field("backend", &self.backend)
            .field("registry", &self.registry)
            .finish()
    }
}
