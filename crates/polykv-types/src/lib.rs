//! Foundation types for the polykv object store.
//!
//! Every record persisted by `polykv-store` is one of a closed set of shapes
//! sharing a small capability set: an identity assigned by the store, a
//! non-unique name, and a kind tag derived from the concrete type.
//!
//! # Key Types
//!
//! - [`Record`]: sum type over every storable shape
//! - [`Person`], [`Animal`]: the concrete record shapes
//! - [`TypedRecord`]: accessors shared by the concrete shapes
//! - [`Kind`]: stable string tag identifying a shape
//! - [`RecordId`]: UUID v7 record identifier
//!
//! Names and kind tags must never contain [`DELIMITER`]; see [`names`].

pub mod error;
pub mod id;
pub mod kind;
pub mod names;
pub mod record;

pub use error::TypeError;
pub use id::RecordId;
pub use kind::Kind;
pub use names::{contains_delimiter, validate_name, DELIMITER};
pub use record::{Animal, Person, Record, TypedRecord};
