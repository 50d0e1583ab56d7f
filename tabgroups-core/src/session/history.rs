//! Bounded group navigation history

use std::collections::VecDeque;

use crate::models::GroupId;

/// Forward/back stack of loaded groups
///
/// Loading a group appends it and moves the cursor to the end. Traversal
/// first prunes entries whose group no longer exists.
#[derive(Debug, Clone)]
pub struct GroupHistory {
    entries: VecDeque<GroupId>,
    cursor: Option<usize>,
    capacity: usize,
}

impl GroupHistory {
    /// Creates an empty history keeping at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Records a loaded group
    pub fn add(&mut self, group_id: GroupId) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(group_id);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Moves forward; `None` when already at the newest entry
    pub fn next(&mut self, existing: &[GroupId]) -> Option<GroupId> {
        self.prune(existing);
        let target = self.cursor.map_or(0, |c| c + 1);
        let group_id = *self.entries.get(target)?;
        self.cursor = Some(target);
        Some(group_id)
    }

    /// Moves back; `None` when already at the oldest entry
    pub fn prev(&mut self, existing: &[GroupId]) -> Option<GroupId> {
        self.prune(existing);
        let target = self.cursor?.checked_sub(1)?;
        let group_id = *self.entries.get(target)?;
        self.cursor = Some(target);
        Some(group_id)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self, existing: &[GroupId]) {
        let Some(cursor) = self.cursor else {
            self.entries.retain(|id| existing.contains(id));
            return;
        };

        // Keep the cursor on the same entry or the nearest older one. With
        // nothing older left, it goes before the first entry.
        let kept_up_to_cursor = self
            .entries
            .iter()
            .take(cursor + 1)
            .filter(|id| existing.contains(id))
            .count();
        self.entries.retain(|id| existing.contains(id));
        self.cursor = kept_up_to_cursor.checked_sub(1);
    }
}
