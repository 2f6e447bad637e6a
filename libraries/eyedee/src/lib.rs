//! Typed UUID identifiers.
//!
//! An `Id<Person>` and an `Id<Fine>` are both UUIDs on the wire, but they can't be mixed up in code.
//! The tag type is never instantiated, it only exists at compile time.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use uuid::Uuid;

pub struct Id<Tag> {
    uuid: Uuid,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Tag> Id<Tag> {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _tag: PhantomData,
        }
    }

    /// A fresh random (v4) identifier.
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Reinterprets the identifier under another tag.
    pub fn cast<Other>(self) -> Id<Other> {
        Id::from_uuid(self.uuid)
    }
}

impl<Tag> Clone for Id<Tag> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tag> Copy for Id<Tag> {}

impl<Tag> PartialEq for Id<Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<Tag> Eq for Id<Tag> {}

impl<Tag> PartialOrd for Id<Tag> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Tag> Ord for Id<Tag> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<Tag> Hash for Id<Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<Tag> fmt::Debug for Id<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.uuid)
    }
}

// Remote keys are stored upper-case.
impl<Tag> fmt::Display for Id<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = Uuid::encode_buffer();
        f.write_str(self.uuid.hyphenated().encode_upper(&mut buffer))
    }
}

impl<Tag> FromStr for Id<Tag> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

impl<Tag> From<Uuid> for Id<Tag> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<Tag> serde::Serialize for Id<Tag> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, Tag> serde::Deserialize<'de> for Id<Tag> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;
    struct Fine;

    #[test]
    fn test_random_ids_differ() {
        let id1 = Id::<Person>::random();
        let id2 = Id::<Person>::random();

        assert_ne!(id1, id2);
        assert_eq!(id1.to_string().len(), 36);
        assert!(id1.to_string().chars().filter(|&c| c == '-').count() == 4);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower: Id<Fine> = "d7b3c296-54cb-4417-8824-ecee22eb5eaf".parse().unwrap();
        let upper: Id<Fine> = "D7B3C296-54CB-4417-8824-ECEE22EB5EAF".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "D7B3C296-54CB-4417-8824-ECEE22EB5EAF");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let id: Id<Person> = "fb3f6718-8cc5-4d2e-aca1-398a15fc1be7".parse().unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("FB3F6718-8CC5-4D2E-ACA1-398A15FC1BE7"));

        let back: Id<Person> = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_value::<Id<Person>>(serde_json::json!("nope")).is_err());
        assert!(serde_json::from_value::<Id<Person>>(serde_json::json!(12)).is_err());
    }

    #[test]
    fn test_cast_keeps_uuid() {
        let id = Id::<Person>::random();
        let other: Id<Fine> = id.cast();
        assert_eq!(id.uuid(), other.uuid());
    }
}
