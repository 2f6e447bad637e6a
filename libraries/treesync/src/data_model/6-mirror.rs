//! # Mirror
//! A Mirror is a shared, caller-owned list kept in sync by a collection subscription. It adds a "dirty" flag so a
//! consumer (typically a view) knows when to re-compute derived data, and a "loaded" flag that flips once the
//! initial children have been delivered.
//!
//! Reconciliation and caller-side edits (e.g. sorting) go through the same lock, so a mirror may be shared between
//! subscriptions and threads.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data_model::{Reconcile, Record};

struct Tracked<T> {
    items: Vec<T>,
    dirty: bool,
    loaded_at_least_once: bool,
}

/// Smart pointer that marks the mirror as dirty when dereferenced mutably
pub struct DirtyOnDerefMut<'a, T> {
    guard: MutexGuard<'a, Tracked<T>>,
}

impl<T> Deref for DirtyOnDerefMut<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.guard.items
    }
}

impl<T> DerefMut for DirtyOnDerefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.dirty = true;
        &mut self.guard.items
    }
}

pub struct Mirror<T> {
    inner: Arc<Mutex<Tracked<T>>>,
}

impl<T> Clone for Mirror<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

impl<T> Mirror<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tracked {
                items,
                // Creating a mirror is an action that warrants a render.
                dirty: true,
                loaded_at_least_once: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracked<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the list for editing. Any mutable access marks the mirror dirty.
    pub fn edit(&self) -> DirtyOnDerefMut<'_, T> {
        DirtyOnDerefMut { guard: self.lock() }
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.lock().items)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().items.clone()
    }

    /// Returns whether the mirror changed since the last call, and resets the flag.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.lock().dirty)
    }

    pub fn loaded_at_least_once(&self) -> bool {
        self.lock().loaded_at_least_once
    }

    /// Returns true if the `loaded` marker was changed
    pub fn mark_loaded(&self) -> bool {
        let mut tracked = self.lock();
        if tracked.loaded_at_least_once {
            return false;
        }
        tracked.loaded_at_least_once = true;
        tracked.dirty = true;
        true
    }
}

impl<T: Record + PartialEq> Mirror<T> {
    /// Applies one reconciliation step. Only an actual change marks the mirror dirty.
    pub fn apply(&self, step: Reconcile<T>) -> bool {
        let mut tracked = self.lock();
        let changed = step.apply(&mut tracked.items);
        tracked.dirty |= changed;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, serde::Deserialize)]
    struct Row {
        id: u32,
        value: i64,
    }

    impl Record for Row {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn test_new_mirror_is_dirty_and_not_loaded() {
        let mirror = Mirror::<Row>::new();
        assert!(mirror.take_dirty());
        assert!(!mirror.take_dirty());
        assert!(!mirror.loaded_at_least_once());
    }

    #[test]
    fn test_apply_marks_dirty_only_on_change() {
        let mirror = Mirror::new();
        mirror.take_dirty();

        assert!(mirror.apply(Reconcile::Upsert(Row { id: 1, value: 10 })));
        assert!(mirror.take_dirty());

        assert!(!mirror.apply(Reconcile::Upsert(Row { id: 1, value: 10 })));
        assert!(!mirror.take_dirty());

        assert_eq!(mirror.snapshot(), vec![Row { id: 1, value: 10 }]);
    }

    #[test]
    fn test_edit_marks_dirty() {
        let mirror = Mirror::from_items(vec![Row { id: 2, value: 1 }, Row { id: 1, value: 2 }]);
        mirror.take_dirty();

        // Reading through the guard doesn't count as a change.
        assert_eq!(mirror.edit().len(), 2);
        assert!(!mirror.take_dirty());

        mirror.edit().sort_by_key(|row| row.id);
        assert!(mirror.take_dirty());
        assert_eq!(mirror.with(|rows| rows[0].id), 1);
    }

    #[test]
    fn test_mark_loaded_once() {
        let mirror = Mirror::<Row>::new();
        assert!(mirror.mark_loaded());
        assert!(!mirror.mark_loaded());
        assert!(mirror.loaded_at_least_once());
    }
}
