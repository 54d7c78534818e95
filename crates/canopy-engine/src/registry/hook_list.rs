//! Copy-on-write listener lists

use std::sync::Arc;

use parking_lot::RwLock;

use crate::listener::ListenerId;

/// A list entry tagged with the listener type that produced it
#[derive(Clone)]
pub(crate) struct Registered<F> {
    pub id: ListenerId,
    pub item: F,
}

/// Ordered list whose readers iterate a snapshot
///
/// Mutation swaps in a new vector, so a dispatch in progress keeps iterating
/// the list as it was when the dispatch started.
pub(crate) struct HookList<F> {
    entries: RwLock<Arc<Vec<Registered<F>>>>,
}

impl<F: Clone> HookList<F> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Registered<F>>> {
        Arc::clone(&self.entries.read())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: &ListenerId) -> bool {
        self.entries.read().iter().any(|e| &e.id == id)
    }

    /// Append unless `id` is already present; returns whether it was added
    pub fn push_unique(&self, id: &ListenerId, item: F) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| &e.id == id) {
            return false;
        }
        Arc::make_mut(&mut entries).push(Registered {
            id: id.clone(),
            item,
        });
        true
    }

    /// Remove `id`; returns whether it was present
    pub fn remove(&self, id: &ListenerId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|e| &e.id == id) {
            return false;
        }
        Arc::make_mut(&mut entries).retain(|e| &e.id != id);
        true
    }

    pub fn ids(&self) -> Vec<ListenerId> {
        self.entries.read().iter().map(|e| e.id.clone()).collect()
    }
}

impl<F: Clone> Default for HookList<F> {
    fn default() -> Self {
        Self::new()
    }
}
