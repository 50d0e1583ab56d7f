//! Recently removed groups
//!
//! A removed group keeps its settings and a snapshot of its tabs until the
//! session ends, so the removal can be undone from the toolbar menu or the
//! notification.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::models::{Group, GroupId, GroupSummary};

type TrashEntry<T> = (T, DateTime<Utc>);

/// Session-scoped store of removed groups
#[derive(Debug, Default)]
pub struct GroupTrash {
    entries: Mutex<Vec<TrashEntry<Group>>>,
}

impl GroupTrash {
    /// Creates an empty trash
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TrashEntry<Group>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keeps a removed group with its tabs
    pub fn push(&self, group: Group) {
        let mut entries = self.lock();
        entries.retain(|(g, _)| g.id != group.id);
        entries.push((group, Utc::now()));
    }

    /// Takes a group out of the trash
    pub fn take(&self, group_id: GroupId) -> Option<Group> {
        let mut entries = self.lock();
        let index = entries.iter().position(|(g, _)| g.id == group_id)?;
        Some(entries.remove(index).0)
    }

    /// Removed groups, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<(GroupSummary, DateTime<Utc>)> {
        self.lock()
            .iter()
            .map(|(group, time)| (group.summary(), *time))
            .collect()
    }

    /// Forgets every entry
    pub fn clear(&self) {
        self.lock().clear();
    }
}
