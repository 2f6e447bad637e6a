//! The two capabilities a transport can offer. Fetching needs [`RemoteRead`], observing needs [`RemoteWatch`].

use std::future::Future;

use futures::stream::BoxStream;
use serde_json::Value;

use crate::data_model::{ChildEvent, Path, TransportError, ValueEvent};

pub trait RemoteRead: Send + Sync + 'static {
    /// Reads the node at `path` once. `Ok(None)` means the node is absent.
    fn read(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Option<Value>, TransportError>> + Send;
}

/// Watches must be registered synchronously: no change made after `watch_*` returns may be missed by the stream.
/// Events of one stream are delivered in the order the changes happened.
pub trait RemoteWatch: Send + Sync + 'static {
    /// Starts with the current state of the node, then one event per change.
    fn watch_value(&self, path: &Path) -> BoxStream<'static, ValueEvent>;

    /// Starts with one `Added` per existing child and a `Synced` marker, then one event per child change.
    fn watch_children(&self, path: &Path) -> BoxStream<'static, ChildEvent>;
}
