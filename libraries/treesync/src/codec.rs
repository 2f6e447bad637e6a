//! Converts untyped tree nodes into typed values and back.
//!
//! Decoding is structural and delegated to serde: a missing required field and a field of the wrong kind are both
//! [`DecodeError`]s. Whether a node exists at all is decided before the codec runs, see [`present`].
//!
//! Keyed collections decode atomically. One malformed child fails the whole collection, callers must treat
//! "one bad record" as "list unavailable".

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::data_model::{DecodeError, ID_FIELD, Record};

/// Types that are stored as a single primitive node.
pub trait Scalar: DeserializeOwned {}

impl Scalar for String {}
impl Scalar for bool {}
impl Scalar for i32 {}
impl Scalar for i64 {}
impl Scalar for u32 {}
impl Scalar for u64 {}
impl Scalar for f32 {}
impl Scalar for f64 {}

#[derive(Debug, thiserror::Error)]
#[error("value can't be represented as a tree node: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

pub fn decode<T: DeserializeOwned>(raw: &Value) -> Result<T, DecodeError> {
    Ok(T::deserialize(raw)?)
}

pub fn encode<T: Serialize>(value: &T) -> Result<Value, EncodeError> {
    Ok(serde_json::to_value(value)?)
}

/// Decodes one record of a keyed collection. `key` is the node's key and wins over any `id` in the payload.
pub fn decode_keyed<T: Record>(key: &str, raw: &Value) -> Result<T, DecodeError> {
    let Value::Object(fields) = raw else {
        return Err(DecodeError::NotKeyed {
            found: kind_name(raw),
        });
    };
    let mut fields = fields.clone();
    fields.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
    decode(&Value::Object(fields))
}

/// Decodes only the identifier of a record from its node key.
pub fn decode_key<T: Record>(key: &str) -> Result<T::Id, DecodeError> {
    key.parse().map_err(|e: <T::Id as std::str::FromStr>::Err| DecodeError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes a map of `key -> record payload`, in the map's order.
pub fn decode_collection<T: Record>(raw: &Value) -> Result<Vec<T>, DecodeError> {
    let Value::Object(children) = raw else {
        return Err(DecodeError::NotKeyed {
            found: kind_name(raw),
        });
    };
    children
        .iter()
        .map(|(key, child)| {
            decode_keyed(key, child).map_err(|e| DecodeError::Child {
                key: key.clone(),
                source: Box::new(e),
            })
        })
        .collect()
}

/// Decodes a plain list of values.
pub fn decode_unkeyed_list<T: DeserializeOwned>(raw: &Value) -> Result<Vec<T>, DecodeError> {
    let Value::Array(items) = raw else {
        return Err(DecodeError::NotAList {
            found: kind_name(raw),
        });
    };
    items.iter().map(decode::<T>).collect()
}

/// Returns the node if it holds data. Null, `{}` and `[]` all count as "no data".
pub fn present(raw: Option<Value>) -> Option<Value> {
    raw.filter(|value| !is_empty_node(value))
}

pub fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// The children of a keyed node, without empty children.
pub(crate) fn children(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(
            map.iter()
                .filter(|(_, child)| !is_empty_node(child))
                .map(|(key, child)| (key.clone(), child.clone()))
                .collect(),
        ),
        Value::Null => Some(Map::new()),
        _ => None,
    }
}
