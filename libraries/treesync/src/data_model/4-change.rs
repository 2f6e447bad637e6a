//! # Change events
//! These are what a transport delivers to an open watch. They are still untyped; decoding happens in the observer.
//!
//! A value watch sees the whole node each time it changes. A children watch sees one event per child: added,
//! changed or removed. A children watch starts with one `Added` per existing child, followed by `Synced`.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum ValueEvent {
    /// The node now holds this (non-empty) value.
    Changed(Value),
    /// The node is absent or empty.
    Removed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildEvent {
    Added { key: String, value: Value },
    Changed { key: String, value: Value },
    /// `value` is the last value the child held.
    Removed { key: String, value: Value },
    /// The initial children have all been delivered.
    Synced,
    /// The watched node holds a scalar or list instead of a map of children.
    NotKeyed { value: Value },
}

impl ChildEvent {
    pub fn kind(&self) -> Option<ChildEventKind> {
        match self {
            ChildEvent::Added { .. } => Some(ChildEventKind::Added),
            ChildEvent::Changed { .. } => Some(ChildEventKind::Changed),
            ChildEvent::Removed { .. } => Some(ChildEventKind::Removed),
            ChildEvent::Synced | ChildEvent::NotKeyed { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildEventKind {
    Added,
    Changed,
    Removed,
}

/// Which child events a collection subscription reacts to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventFilter {
    pub added: bool,
    pub changed: bool,
    pub removed: bool,
}

impl EventFilter {
    pub const ALL: EventFilter = EventFilter {
        added: true,
        changed: true,
        removed: true,
    };

    pub const fn only(kind: ChildEventKind) -> Self {
        EventFilter {
            added: matches!(kind, ChildEventKind::Added),
            changed: matches!(kind, ChildEventKind::Changed),
            removed: matches!(kind, ChildEventKind::Removed),
        }
    }

    pub fn accepts(&self, kind: ChildEventKind) -> bool {
        match kind {
            ChildEventKind::Added => self.added,
            ChildEventKind::Changed => self.changed,
            ChildEventKind::Removed => self.removed,
        }
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        EventFilter::ALL
    }
}
