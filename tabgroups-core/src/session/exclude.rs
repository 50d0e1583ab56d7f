//! Transient exclusion of tabs from the event pipeline
//!
//! Operations the engine performs on a tab it just created (hide, remove,
//! show) would otherwise come back through the event handlers and be
//! reconciled a second time. Membership is scoped: an [`ExcludeGuard`]
//! adds ids on creation and removes them on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::TabId;

/// Set of tab ids the event handlers must ignore
#[derive(Debug, Default)]
pub struct ExcludeSet {
    // Count per id, overlapping guards may exclude the same tab
    ids: Mutex<HashMap<TabId, usize>>,
}

impl ExcludeSet {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes `ids` until the returned guard is dropped
    pub fn guard(self: &Arc<Self>, ids: impl IntoIterator<Item = TabId>) -> ExcludeGuard {
        let mut guard = ExcludeGuard {
            set: Arc::clone(self),
            ids: Vec::new(),
        };
        guard.extend(ids);
        guard
    }

    /// Returns true if the tab is excluded
    #[must_use]
    pub fn contains(&self, tab_id: TabId) -> bool {
        self.lock().contains_key(&tab_id)
    }

    /// Returns true if nothing is excluded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, usize>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, ids: &[TabId]) {
        let mut set = self.lock();
        for id in ids {
            if let Some(count) = set.get_mut(id) {
                *count -= 1;
                if *count == 0 {
                    set.remove(id);
                }
            }
        }
    }
}

/// Scoped exclusion; ids leave the set when the guard is dropped
#[must_use = "tabs are no longer excluded once the guard is dropped"]
#[derive(Debug)]
pub struct ExcludeGuard {
    set: Arc<ExcludeSet>,
    ids: Vec<TabId>,
}

impl ExcludeGuard {
    /// Excludes more ids under the same guard
    pub fn extend(&mut self, ids: impl IntoIterator<Item = TabId>) {
        let mut set = self.set.lock();
        for id in ids {
            *set.entry(id).or_insert(0) += 1;
            self.ids.push(id);
        }
    }

    /// Ids held by this guard
    #[must_use]
    pub fn ids(&self) -> &[TabId] {
        &self.ids
    }
}

impl Drop for ExcludeGuard {
    fn drop(&mut self) {
        self.set.release(&self.ids);
    }
}
