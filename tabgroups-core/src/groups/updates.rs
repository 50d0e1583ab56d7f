//! Debounced `group-updated` broadcasts
//!
//! Tab events arrive in bursts. Each affected group is refreshed once the
//! burst goes quiet.

use std::sync::Arc;
use std::time::Duration;

use crate::coalesce::CoalescingBatch;
use crate::messages::{BgMessage, GroupUpdate};
use crate::models::GroupId;
use crate::state::SessionState;

use super::GroupStore;

/// Schedules `group-updated` broadcasts per group
pub struct GroupUpdates {
    batch: CoalescingBatch<GroupId, ()>,
}

impl GroupUpdates {
    /// Starts the debounce worker
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn spawn(state: &Arc<SessionState>, store: Arc<GroupStore>) -> Self {
        let quiet = Duration::from_millis(state.settings.timing.group_updated_ms);
        let state = Arc::clone(state);
        let batch = CoalescingBatch::spawn(quiet, move |group_id: GroupId, _: Vec<()>| {
            let state = Arc::clone(&state);
            let store = Arc::clone(&store);
            async move {
                match store.load_one_with_tabs(group_id).await {
                    Ok(group) => state.send(BgMessage::GroupUpdated {
                        group: GroupUpdate::tabs(group_id, group.tabs),
                    }),
                    Err(e) => tracing::debug!(group_id = %group_id, error = %e, "Group update skipped"),
                }
            }
        });
        Self { batch }
    }

    /// Schedules a refresh of `group_id`
    pub fn schedule(&self, group_id: GroupId) {
        self.batch.push(group_id, ());
    }

    /// Schedules a refresh of every group in `group_ids`
    pub fn schedule_all(&self, group_ids: impl IntoIterator<Item = GroupId>) {
        for group_id in group_ids {
            self.schedule(group_id);
        }
    }
}

impl std::fmt::Debug for GroupUpdates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupUpdates").finish_non_exhaustive()
    }
}
