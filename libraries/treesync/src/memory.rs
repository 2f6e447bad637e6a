//! An in-process remote store.
//!
//! It holds the whole tree as one JSON value and emits change events to its watchers after every mutation.
//! It behaves like the hosted store in the ways the fetcher and observer depend on: absent and empty nodes read as
//! `None`, value watches fire immediately with the current state, and children watches replay the existing children
//! before any change.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::stream::BoxStream;
use serde_json::{Map, Value};

use crate::codec::{children, present};
use crate::data_model::{ChildEvent, Path, TransportError, ValueEvent};
use crate::store::{RemoteRead, RemoteWatch};

enum Watch {
    Value {
        sender: UnboundedSender<ValueEvent>,
        last: Option<Value>,
    },
    Children {
        sender: UnboundedSender<ChildEvent>,
        last: Map<String, Value>,
        not_keyed: bool,
    },
}

struct Watcher {
    path: Path,
    watch: Watch,
}

struct Inner {
    root: Value,
    watchers: Vec<Watcher>,
    read_failure: Option<String>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_root(Value::Object(Map::new()))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: Value) -> Self {
        Self {
            inner: Mutex::new(Inner {
                root,
                watchers: Vec::new(),
                read_failure: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The node at `path`, or `None` if it is absent or empty.
    pub fn get(&self, path: &Path) -> Option<Value> {
        present(node(&self.lock().root, path).cloned())
    }

    /// Replaces the node at `path`, creating parents as needed. Setting `null` removes the node.
    pub fn set(&self, path: &Path, value: Value) {
        let mut inner = self.lock();
        if value.is_null() {
            remove_node(&mut inner.root, path);
        } else {
            *node_mut(&mut inner.root, path) = value;
        }
        inner.notify();
    }

    pub fn remove(&self, path: &Path) {
        self.set(path, Value::Null);
    }

    /// Makes every following read fail with a transport error, until called with `None`.
    pub fn fail_reads(&self, message: Option<&str>) {
        self.lock().read_failure = message.map(str::to_string);
    }

    /// Number of watches whose stream is still alive.
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|watcher| match &watcher.watch {
            Watch::Value { sender, .. } => !sender.is_closed(),
            Watch::Children { sender, .. } => !sender.is_closed(),
        });
        inner.watchers.len()
    }
}

impl Inner {
    fn notify(&mut self) {
        let root = &self.root;
        self.watchers.retain_mut(|watcher| {
            let current = node(root, &watcher.path).cloned();
            match &mut watcher.watch {
                Watch::Value { sender, last } => {
                    let current = present(current);
                    if current == *last {
                        return !sender.is_closed();
                    }
                    *last = current.clone();
                    let event = match current {
                        Some(value) => ValueEvent::Changed(value),
                        None => ValueEvent::Removed,
                    };
                    sender.unbounded_send(event).is_ok()
                }
                Watch::Children {
                    sender,
                    last,
                    not_keyed,
                } => {
                    let events = diff_children(last, not_keyed, current.unwrap_or(Value::Null));
                    events
                        .into_iter()
                        .all(|event| sender.unbounded_send(event).is_ok())
                }
            }
        });
    }
}

/// Computes the child events between the last known children and the current node, and updates the state.
fn diff_children(
    last: &mut Map<String, Value>,
    not_keyed: &mut bool,
    current: Value,
) -> Vec<ChildEvent> {
    let mut events = Vec::new();
    let Some(current_children) = children(&current) else {
        for (key, value) in std::mem::take(last) {
            events.push(ChildEvent::Removed { key, value });
        }
        if !*not_keyed {
            *not_keyed = true;
            events.push(ChildEvent::NotKeyed { value: current });
        }
        return events;
    };
    *not_keyed = false;

    for (key, value) in last.iter() {
        if !current_children.contains_key(key) {
            events.push(ChildEvent::Removed {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    for (key, value) in current_children.iter() {
        match last.get(key) {
            None => events.push(ChildEvent::Added {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(previous) if previous != value => events.push(ChildEvent::Changed {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }
    *last = current_children;
    events
}

fn node<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn node_mut<'a>(root: &'a mut Value, path: &Path) -> &'a mut Value {
    path.segments().iter().fold(root, |node, segment| {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            _ => unreachable!("node was just replaced by a map"),
        }
    })
}

fn remove_node(root: &mut Value, path: &Path) {
    let Some(key) = path.key() else {
        *root = Value::Object(Map::new());
        return;
    };
    let parent = path.parent().unwrap_or_default();
    let parent_node = parent
        .segments()
        .iter()
        .try_fold(&mut *root, |node, segment| node.as_object_mut()?.get_mut(segment));
    if let Some(Value::Object(map)) = parent_node {
        map.remove(key);
    }
}

impl RemoteRead for MemoryStore {
    fn read(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Option<Value>, TransportError>> + Send {
        let result = {
            let inner = self.lock();
            match &inner.read_failure {
                Some(message) => Err(TransportError::new(message.clone())),
                None => Ok(present(node(&inner.root, path).cloned())),
            }
        };
        async move { result }
    }
}

impl RemoteWatch for MemoryStore {
    fn watch_value(&self, path: &Path) -> BoxStream<'static, ValueEvent> {
        let (sender, receiver) = unbounded();
        let mut inner = self.lock();
        let current = present(node(&inner.root, path).cloned());
        let initial = match &current {
            Some(value) => ValueEvent::Changed(value.clone()),
            None => ValueEvent::Removed,
        };
        // The receiver is alive, this can't fail.
        let _ = sender.unbounded_send(initial);
        inner.watchers.push(Watcher {
            path: path.clone(),
            watch: Watch::Value {
                sender,
                last: current,
            },
        });
        receiver.boxed()
    }

    fn watch_children(&self, path: &Path) -> BoxStream<'static, ChildEvent> {
        let (sender, receiver) = unbounded();
        let mut inner = self.lock();
        let current = node(&inner.root, path).cloned().unwrap_or(Value::Null);
        let mut last = Map::new();
        let mut not_keyed = false;
        for event in diff_children(&mut last, &mut not_keyed, current) {
            let _ = sender.unbounded_send(event);
        }
        let _ = sender.unbounded_send(ChildEvent::Synced);
        inner.watchers.push(Watcher {
            path: path.clone(),
            watch: Watch::Children {
                sender,
                last,
                not_keyed,
            },
        });
        receiver.boxed()
    }
}
