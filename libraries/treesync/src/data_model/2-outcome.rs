//! # Outcome
//! Every one-shot read ends in exactly one of: a typed value, [`FetchError::NoData`] (the node is absent or empty),
//! [`FetchError::Decode`] (the node exists but has the wrong shape), or [`FetchError::Transport`] (the read itself failed).
//! `NoData` is a property of the path, `Decode` is a property of the shape. They must never be conflated.

/// The node exists but could not be turned into the requested type.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected keyed data (a map of child nodes), found {found}")]
    NotKeyed { found: &'static str },

    #[error("expected a list, found {found}")]
    NotAList { found: &'static str },

    #[error("invalid identifier {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("child {key:?}: {source}")]
    Child {
        key: String,
        #[source]
        source: Box<DecodeError>,
    },

    #[error("{0}")]
    Shape(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(error: serde_json::Error) -> Self {
        DecodeError::Shape(error.to_string())
    }
}

/// The store could not be reached, or refused the request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("no data at path")]
    NoData,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, FetchError::NoData)
    }
}

pub type Outcome<T> = Result<T, FetchError>;

pub trait OutcomeExt<T> {
    /// Treats an absent node as a normal "not configured" value.
    fn optional(self) -> Result<Option<T>, FetchError>;

    /// Treats an absent node as the default value, e.g. an empty list.
    fn or_default(self) -> Result<T, FetchError>
    where
        T: Default;
}

impl<T> OutcomeExt<T> for Outcome<T> {
    fn optional(self) -> Result<Option<T>, FetchError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(FetchError::NoData) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn or_default(self) -> Result<T, FetchError>
    where
        T: Default,
    {
        match self {
            Err(FetchError::NoData) => Ok(T::default()),
            other => other,
        }
    }
}
