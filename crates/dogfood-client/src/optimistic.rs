//! Optimistic entity with temp-id reconciliation.
//!
//! Drawer-style UIs insert an entry immediately with a locally generated
//! placeholder id, then swap it in place when the store assigns the durable
//! id, or remove it when the write fails. This generalises that pattern for
//! any entity type.

use uuid::Uuid;

/// A locally generated placeholder id for a not-yet-confirmed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempId(Uuid);

/// An entry that may still be awaiting its durable write.
#[derive(Debug, Clone)]
pub struct OptimisticEntry<T> {
    temp_id: Option<TempId>,
    pub value: T,
}

impl<T> OptimisticEntry<T> {
    /// Whether the durable id has not arrived yet.
    pub fn is_pending(&self) -> bool {
        self.temp_id.is_some()
    }
}

/// Ordered collection of optimistic entries.
#[derive(Debug, Default)]
pub struct OptimisticSet<T> {
    entries: Vec<OptimisticEntry<T>>,
}

impl<T> OptimisticSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a pending entry and return its placeholder id.
    pub fn insert_pending(&mut self, value: T) -> TempId {
        let temp_id = TempId(Uuid::new_v4());
        self.entries.push(OptimisticEntry {
            temp_id: Some(temp_id),
            value,
        });
        temp_id
    }

    /// Insert an already-durable entry (e.g. from an initial load).
    pub fn insert_confirmed(&mut self, value: T) {
        self.entries.push(OptimisticEntry {
            temp_id: None,
            value,
        });
    }

    /// Replace the pending entry in place with the server-confirmed value.
    /// Returns `false` when no entry with that placeholder remains.
    pub fn confirm(&mut self, temp_id: TempId, confirmed: T) -> bool {
        match self.position_of(temp_id) {
            Some(pos) => {
                self.entries[pos] = OptimisticEntry {
                    temp_id: None,
                    value: confirmed,
                };
                true
            }
            None => false,
        }
    }

    /// The durable write failed: remove the placeholder entry.
    pub fn fail(&mut self, temp_id: TempId) -> Option<T> {
        let pos = self.position_of(temp_id)?;
        Some(self.entries.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptimisticEntry<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, temp_id: TempId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.temp_id == Some(temp_id))
    }
}
