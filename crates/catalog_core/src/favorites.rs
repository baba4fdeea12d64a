use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::domain::BeerId;

/// In-memory favorite marks, keyed by record id. Persisting them is up to
/// the embedding shell.
#[derive(Default)]
pub struct FavoriteSet {
    ids: Mutex<HashSet<BeerId>>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the mark for `id`, returning the new state.
    pub fn toggle(&self, id: BeerId) -> bool {
        let mut ids = self.lock();
        if ids.remove(&id) {
            false
        } else {
            ids.insert(id);
            true
        }
    }

    pub fn is_favorite(&self, id: BeerId) -> bool {
        self.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<BeerId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/favorites_tests.rs"]
mod tests;
