//! # Reconcile
//! One reconciliation step is exactly the change implied by one child event. Applying it never re-sorts the list:
//! a replaced record keeps its index, a new record goes to the end, a removed record leaves the others in place.

use crate::data_model::Record;

#[derive(Clone, Debug, PartialEq)]
pub enum Reconcile<T: Record> {
    Upsert(T),
    Remove(T::Id),
}

impl<T: Record> Reconcile<T> {
    /// Applies the step to `list`. Returns true if the list was changed.
    pub fn apply(self, list: &mut Vec<T>) -> bool
    where
        T: PartialEq,
    {
        match self {
            Reconcile::Upsert(record) => {
                match list.iter().position(|existing| existing.id() == record.id()) {
                    Some(index) if list[index] == record => false,
                    Some(index) => {
                        list[index] = record;
                        true
                    }
                    None => {
                        list.push(record);
                        true
                    }
                }
            }
            Reconcile::Remove(id) => match list.iter().position(|existing| existing.id() == &id) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    pub fn id(&self) -> &T::Id {
        match self {
            Reconcile::Upsert(record) => record.id(),
            Reconcile::Remove(id) => id,
        }
    }
}
