//! Last-known remote state per document.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::trace;

/// A document value the worker may hold a copy of.
///
/// Equality decides whether the worker's copy is still the document the
/// caller is about to send; the id groups successive versions of the same
/// document.
pub trait Snapshot: Clone + PartialEq {
    type Id: Clone + Eq + Hash + Debug;

    fn snapshot_id(&self) -> Self::Id;
}

/// Remembers, per document id, the last result the worker returned.
#[derive(Debug)]
pub struct StateTracker<D: Snapshot> {
    snapshots: HashMap<D::Id, D>,
}

impl<D: Snapshot> Default for StateTracker<D> {
    fn default() -> Self {
        Self {
            snapshots: HashMap::new(),
        }
    }
}

impl<D: Snapshot> StateTracker<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot the worker holds for `document`, if it still matches.
    ///
    /// A tracked snapshot that differs from `document` is discarded: the
    /// caller's input no longer descends from what the worker last returned,
    /// so the next send must be a full one.
    pub fn prior_for(&mut self, document: &D) -> Option<D> {
        let id = document.snapshot_id();

        match self.snapshots.get(&id) {
            Some(tracked) if tracked == document => Some(tracked.clone()),
            Some(_) => {
                trace!("Snapshot for {id:?} no longer matches, forgetting it");
                self.snapshots.remove(&id);
                None
            }
            None => None,
        }
    }

    /// Record `result` as what the worker now holds.
    pub fn record(&mut self, result: &D) {
        self.snapshots.insert(result.snapshot_id(), result.clone());
    }

    pub fn forget(&mut self, id: &D::Id) -> Option<D> {
        self.snapshots.remove(id)
    }

    pub fn get(&self, id: &D::Id) -> Option<&D> {
        self.snapshots.get(id)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
