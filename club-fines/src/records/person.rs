use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use treesync::Record;

use crate::records::{ListItem, PersonId};

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|last| !last.is_empty()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last: Option<String>,
}

impl PersonName {
    pub fn new(first: impl Into<String>, last: Option<String>) -> Self {
        Self {
            first: first.into(),
            last: last.filter(|last| !last.is_empty()),
        }
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last {
            Some(last) => write!(f, "{} {last}", self.first),
            None => f.write_str(&self.first),
        }
    }
}

/// A name while it is still being typed in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalPersonName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl OptionalPersonName {
    /// The full name, if a first name was entered.
    pub fn complete(&self) -> Option<PersonName> {
        let first = self.first.as_deref().filter(|first| !first.is_empty())?;
        Some(PersonName::new(first, self.last.clone()))
    }
}

impl From<PersonName> for OptionalPersonName {
    fn from(name: PersonName) -> Self {
        Self {
            first: Some(name.first),
            last: name.last,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInData {
    #[serde(rename = "cashier")]
    pub is_cashier: bool,
    pub user_id: String,
    pub sign_in_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: PersonName,
    #[serde(default)]
    pub sign_in_data: Option<SignInData>,
}

impl Person {
    pub fn is_signed_in(&self) -> bool {
        self.sign_in_data.is_some()
    }

    pub fn is_cashier(&self) -> bool {
        self.sign_in_data
            .as_ref()
            .is_some_and(|data| data.is_cashier)
    }
}

impl Record for Person {
    type Id = PersonId;

    fn id(&self) -> &PersonId {
        &self.id
    }
}

impl ListItem for Person {
    const LIST_TYPE: &'static str = "person";
    const COLLECTION: &'static str = "persons";

    fn item_parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("firstName".into(), json!(self.name.first));
        parameters.insert("lastName".into(), json!(self.name.last));
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treesync::codec;

    const P1: &str = "5B0D3F2A-7E51-4C7B-9A0E-3C2D1F4E5A6B";

    #[test]
    fn test_decode_person() {
        let person: Person = codec::decode_keyed(
            P1,
            &json!({
                "name": { "first": "Jane", "last": "Doe" },
                "signInData": {
                    "cashier": true,
                    "userId": "u1",
                    "signInDate": "2021-05-05T10:00:00Z",
                },
            }),
        )
        .unwrap();
        assert_eq!(person.id.to_string(), P1);
        assert_eq!(person.name.to_string(), "Jane Doe");
        assert!(person.is_cashier());
    }

    #[test]
    fn test_empty_last_name_is_none() {
        let person: Person =
            codec::decode_keyed(P1, &json!({ "name": { "first": "Jane", "last": "" } })).unwrap();
        assert_eq!(person.name, PersonName::new("Jane", None));
        assert!(!person.is_signed_in());
        assert_eq!(person.name.to_string(), "Jane");
    }

    #[test]
    fn test_missing_first_name_fails() {
        assert!(codec::decode_keyed::<Person>(P1, &json!({ "name": { "last": "Doe" } })).is_err());
    }

    #[test]
    fn test_optional_name_completion() {
        let mut name = OptionalPersonName::default();
        assert_eq!(name.complete(), None);
        name.last = Some("Doe".into());
        assert_eq!(name.complete(), None);
        name.first = Some("Jane".into());
        assert_eq!(name.complete(), Some(PersonName::new("Jane", Some("Doe".into()))));
    }
}
