use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::RecordId;
use crate::kind::Kind;
use crate::names::validate_name;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Person {}
    impl Sealed for super::Animal {}
}

/// Accessors shared by every concrete record shape.
///
/// The trait is sealed: the set of shapes is closed so that every persisted
/// kind tag has exactly one decoder. Each implementor also has a variant in
/// [`Record`].
pub trait TypedRecord:
    sealed::Sealed + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Tag written into the composite key.
    const KIND: Kind;

    fn kind(&self) -> Kind {
        Self::KIND
    }

    /// Store-assigned identity, `None` until persisted.
    fn id(&self) -> Option<RecordId>;

    /// Non-unique display name.
    fn name(&self) -> &str;

    fn set_id(&mut self, id: RecordId);

    /// Replace the name, rejecting values containing the reserved delimiter.
    fn set_name(&mut self, name: &str) -> Result<(), TypeError>;

    fn into_record(self) -> Record;
}

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// A person record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub last_name: String,
    /// Free-form birthday as entered (e.g. `"01-02-1990"`).
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub birthdate: DateTime<Utc>,
}

impl Person {
    /// Create an unpersisted person with the given first and last name.
    pub fn new(name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }
}

impl TypedRecord for Person {
    const KIND: Kind = Kind::Person;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn set_name(&mut self, name: &str) -> Result<(), TypeError> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    fn into_record(self) -> Record {
        Record::Person(self)
    }
}

// ---------------------------------------------------------------------------
// Animal
// ---------------------------------------------------------------------------

/// An animal record, optionally pointing at its owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub name: String,
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Species or breed, e.g. `"Cat"`.
    #[serde(rename = "type", default)]
    pub animal_type: String,
    #[serde(default)]
    pub owner_id: String,
}

impl Animal {
    /// Create an unpersisted animal of the given type.
    pub fn new(name: impl Into<String>, animal_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            animal_type: animal_type.into(),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }
}

impl TypedRecord for Animal {
    const KIND: Kind = Kind::Animal;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn set_name(&mut self, name: &str) -> Result<(), TypeError> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    fn into_record(self) -> Record {
        Record::Animal(self)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Any storable record.
///
/// The serde form here is internally tagged by kind and is meant for display
/// (CLI JSON output). The store persists the bare variant payload instead and
/// keeps the kind in the key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    Person(Person),
    Animal(Animal),
}

impl Record {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Person(p) => p.kind(),
            Self::Animal(a) => a.kind(),
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::Person(p) => p.id(),
            Self::Animal(a) => a.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Person(p) => p.name(),
            Self::Animal(a) => a.name(),
        }
    }

    pub fn set_id(&mut self, id: RecordId) {
        match self {
            Self::Person(p) => p.set_id(id),
            Self::Animal(a) => a.set_id(id),
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), TypeError> {
        match self {
            Self::Person(p) => p.set_name(name),
            Self::Animal(a) => a.set_name(name),
        }
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            Self::Person(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_animal(&self) -> Option<&Animal> {
        match self {
            Self::Animal(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Person> for Record {
    fn from(p: Person) -> Self {
        Self::Person(p)
    }
}

impl From<Animal> for Record {
    fn from(a: Animal) -> Self {
        Self::Animal(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn person() -> Person {
        Person {
            name: "alice".into(),
            id: None,
            last_name: "Johnson".into(),
            birthday: "01-02-1990".into(),
            birthdate: Utc.with_ymd_and_hms(1989, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn set_name_validates_delimiter() {
        let mut p = person();
        assert!(p.set_name("").is_ok());
        assert!(p.set_name("ab:c:").is_ok());
        assert_eq!(p.name, "ab:c:");
        assert!(p.set_name("ab::c").is_err());
        // Rejected names leave the previous value in place.
        assert_eq!(p.name, "ab:c:");
    }

    #[test]
    fn kind_follows_concrete_type() {
        assert_eq!(person().kind(), Kind::Person);
        assert_eq!(Animal::new("fluffy", "Cat").kind(), Kind::Animal);
        assert_eq!(Record::from(person()).kind(), Kind::Person);
    }

    #[test]
    fn fresh_records_have_no_id() {
        assert!(person().id().is_none());
        assert!(Animal::new("rex", "Dog").id().is_none());
    }

    #[test]
    fn record_accessors_dispatch() {
        let mut rec = Record::from(Animal::new("rex", "Dog").with_owner("bob"));
        let id = RecordId::new();
        rec.set_id(id);
        assert_eq!(rec.id(), Some(id));
        assert_eq!(rec.name(), "rex");
        rec.set_name("max").unwrap();
        assert_eq!(rec.as_animal().unwrap().name, "max");
        assert!(rec.as_person().is_none());
    }

    #[test]
    fn person_payload_is_field_tagged() {
        let json = serde_json::to_value(person()).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["last_name"], "Johnson");
        assert_eq!(json["birthday"], "01-02-1990");
        assert!(json["birthdate"].as_str().unwrap().starts_with("1989-02-01"));
    }

    #[test]
    fn animal_type_serializes_as_type() {
        let json = serde_json::to_value(Animal::new("fluffy", "Cat").with_owner("Johnson")).unwrap();
        assert_eq!(json["type"], "Cat");
        assert_eq!(json["owner_id"], "Johnson");
    }

    #[test]
    fn missing_optional_fields_default() {
        let p: Person = serde_json::from_str(r#"{"name":"bob"}"#).unwrap();
        assert_eq!(p.name, "bob");
        assert!(p.id.is_none());
        assert!(p.last_name.is_empty());

        let a: Animal = serde_json::from_str(r#"{"name":"tiger","type":"wild-animal"}"#).unwrap();
        assert_eq!(a.animal_type, "wild-animal");
        assert!(a.owner_id.is_empty());
    }

    #[test]
    fn record_display_form_is_kind_tagged() {
        let json = serde_json::to_value(Record::from(person())).unwrap();
        assert_eq!(json["kind"], "Person");
        assert_eq!(json["name"], "alice");
    }
}
