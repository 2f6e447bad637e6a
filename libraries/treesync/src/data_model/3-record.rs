//! # Record
//! Records are the elements of keyed collections. The key of a record's node is its identity, and is also
//! available on the decoded value. The payload stored under the key doesn't have to repeat it: the codec injects
//! the key under [`ID_FIELD`] before decoding.
//!
//! Identity is only ever used for matching during reconciliation. It says nothing about order.

use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Field the node key is injected under before a record is decoded.
pub const ID_FIELD: &str = "id";

pub trait Record: serde::de::DeserializeOwned + Clone + Send + 'static {
    type Id: Clone + PartialEq + Debug + Send + FromStr<Err: Display> + 'static;

    fn id(&self) -> &Self::Id;
}
