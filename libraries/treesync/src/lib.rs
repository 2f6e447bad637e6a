//! This is a library for reading and observing a hierarchical, schemaless remote store with typed results.
//! It was created for a club fines client, so it doesn't include much that was not needed for that project.
//!
//! Model:
//! 1. The remote store is a tree of JSON-like nodes addressed by slash-separated [`Path`]s.
//! 2. A [`Fetcher`] performs exactly one read of a path and decodes it into a typed value, or fails with
//!    [`FetchError::NoData`], [`FetchError::Decode`] or [`FetchError::Transport`]. An absent node is an expected
//!    outcome, never a decode failure.
//! 3. An [`Observer`] subscribes to a path and turns every change event of the store into either a new typed value
//!    (single nodes) or a [`Reconcile`] step (keyed collections) that the caller applies to its own list.
//!    The caller owns the list and its order. [`Mirror`] is a ready-made shared list for callers that don't care.
//! 4. Every subscription is cancelled explicitly through its [`CancelHandle`]. After cancellation no callback runs
//!    again, even for events the transport had already queued.
//!
//! Sounds simple, but there are a few tricky parts that this library handles.

#[cfg(feature = "rest")]
pub mod rest;

pub mod codec;
pub mod data_model;
pub mod fetcher;
pub mod memory;
pub mod observer;
pub mod store;

pub use codec::Scalar;
pub use data_model::*;
pub use fetcher::Fetcher;
pub use memory::MemoryStore;
pub use observer::{CancelHandle, Observer, SubscriptionKey};
pub use store::{RemoteRead, RemoteWatch};
