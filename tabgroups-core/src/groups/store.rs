//! Document-backed group persistence
//!
//! Groups live in the storage document. Read-modify-write cycles are
//! serialized through one async lock so concurrent edits never lose each
//! other's changes. Compiled catch rules are cached until the groups' rules
//! change.

use std::sync::{Arc, PoisonError};

use tokio::sync::Mutex;

use super::CatchRules;
use crate::error::{Result, TabGroupsError};
use crate::host::TabQuery;
use crate::models::{Group, GroupId, Tab};
use crate::state::SessionState;
use crate::storage::StoredData;

/// Reads and writes groups in the storage document
pub struct GroupStore {
    state: Arc<SessionState>,
    write_lock: Mutex<()>,
    rules: std::sync::Mutex<Option<Arc<CatchRules>>>,
}

impl GroupStore {
    /// Creates a store over the state's storage adapter
    #[must_use]
    pub fn new(state: Arc<SessionState>) -> Self {
        Self {
            state,
            write_lock: Mutex::new(()),
            rules: std::sync::Mutex::new(None),
        }
    }

    /// Reads the whole document
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn load_data(&self) -> Result<StoredData> {
        Ok(StoredData::load(self.state.ports.storage.as_ref()).await?)
    }

    /// Runs `f` on the document and writes it back
    ///
    /// Nothing is written when `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a storage error.
    pub async fn update<R>(&self, f: impl FnOnce(&mut StoredData) -> Result<R>) -> Result<R> {
        let _lock = self.write_lock.lock().await;
        let mut data = self.load_data().await?;
        let result = f(&mut data)?;
        data.save(self.state.ports.storage.as_ref()).await?;
        Ok(result)
    }

    /// Groups in display order, without tabs
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn load_all(&self) -> Result<Vec<Group>> {
        Ok(self.load_data().await?.groups)
    }

    /// One group, without tabs
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`] for unknown ids.
    pub async fn load(&self, group_id: GroupId) -> Result<Group> {
        self.load_all()
            .await?
            .into_iter()
            .find(|g| g.id == group_id)
            .ok_or(TabGroupsError::GroupNotFound(group_id))
    }

    /// Groups with their tabs, ordered by window then index
    ///
    /// Tabs of ignored windows and pinned tabs are left out.
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn load_with_tabs(&self) -> Result<Vec<Group>> {
        let mut groups = self.load_all().await?;
        let tabs = self.grouped_tabs().await?;

        for tab in tabs {
            if let Some(group) = groups.iter_mut().find(|g| Some(g.id) == tab.group_id()) {
                group.tabs.push(tab);
            }
        }
        Ok(groups)
    }

    /// One group with its tabs
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::GroupNotFound`] for unknown ids.
    pub async fn load_one_with_tabs(&self, group_id: GroupId) -> Result<Group> {
        self.load_with_tabs()
            .await?
            .into_iter()
            .find(|g| g.id == group_id)
            .ok_or(TabGroupsError::GroupNotFound(group_id))
    }

    async fn grouped_tabs(&self) -> Result<Vec<Tab>> {
        let mut result = Vec::new();
        let host_tabs = self
            .state
            .ports
            .tabs
            .query(TabQuery::all().pinned(false))
            .await?;
        for tab in host_tabs {
            if self.state.is_window_ignored(tab.window_id) {
                continue;
            }
            let tab = self.state.cache.load_tab_session(tab).await;
            if tab.group_id().is_some() {
                result.push(tab);
            }
        }
        Ok(result)
    }

    /// Compiled catch rules of `groups`
    ///
    /// The last compilation is reused while the groups' ids, order, catch
    /// containers and patterns are unchanged.
    pub fn catch_rules(&self, groups: &[Group]) -> Arc<CatchRules> {
        let mut cached = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rules) = cached.as_ref()
            && rules.is_compiled_from(groups)
        {
            return Arc::clone(rules);
        }

        let rules = Arc::new(CatchRules::compile(groups));
        tracing::debug!(groups = groups.len(), "Catch rules compiled");
        *cached = Some(Arc::clone(&rules));
        rules
    }

    /// Replaces every group, keeping their order
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn save(&self, groups: Vec<Group>) -> Result<()> {
        self.update(move |data| {
            data.groups = groups.iter().map(Group::without_tabs).collect();
            Ok(())
        })
        .await
    }

    /// Creates and stores a group with a fresh id
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn allocate(&self, title: Option<String>) -> Result<Group> {
        self.update(move |data| {
            let id = data.next_group_id();
            let group = Group::new(id, title);
            data.groups.push(group.clone());
            Ok(group)
        })
        .await
    }
}

impl std::fmt::Debug for GroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStore").finish_non_exhaustive()
    }
}
