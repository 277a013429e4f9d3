use std::collections::BTreeMap;

use polykv_types::{Animal, Person, Record, TypedRecord};

use crate::error::{StoreError, StoreResult};

/// Deserializes a payload into one concrete record shape.
type Decoder = fn(&[u8]) -> serde_json::Result<Record>;

fn decode_as<T: TypedRecord>(payload: &[u8]) -> serde_json::Result<Record> {
    serde_json::from_slice::<T>(payload).map(T::into_record)
}

/// Maps kind tags to record decoders.
///
/// The tag read back from a key selects the concrete type the payload is
/// decoded into. Tags not registered here fail with
/// [`StoreError::UnknownObjectKind`].
#[derive(Clone)]
pub struct KindRegistry {
    decoders: BTreeMap<&'static str, Decoder>,
}

impl KindRegistry {
    /// A registry with no kinds.
    pub fn empty() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// A registry with every built-in record shape.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register::<Person>().register::<Animal>();
        registry
    }

    /// Register `T` under its kind tag.
    pub fn register<T: TypedRecord>(&mut self) -> &mut Self {
        self.decoders
            .insert(T::KIND.as_str(), decode_as::<T> as Decoder);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered tags in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// Decode `payload` as the record shape registered under `kind`.
    pub fn decode(&self, kind: &str, payload: &[u8]) -> StoreResult<Record> {
        let decoder = self
            .decoders
            .get(kind)
            .ok_or_else(|| StoreError::UnknownObjectKind(kind.to_string()))?;
        decoder(payload).map_err(|e| StoreError::Serialization(format!("{kind} payload: {e}")))
    }

    /// Serialize the bare variant of `record`.
    ///
    /// The kind lives in the key, so the payload is just the concrete
    /// shape's fields.
    pub fn encode(record: &Record) -> StoreResult<Vec<u8>> {
        let encoded = match record {
            Record::Person(p) => serde_json::to_vec(p),
            Record::Animal(a) => serde_json::to_vec(a),
        };
        encoded.map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRegistry")
            .field("kinds", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}
