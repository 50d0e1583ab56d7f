//! Backups of groups, hotkeys, options and tabs
//!
//! A backup is the storage document plus what lives only in the host: the
//! tabs of every group (url, title, container and optionally the session
//! favicon and thumbnail), pinned tabs and the containers referenced by
//! groups. Restoring merges a backup into the current document: incoming
//! groups get fresh ids after the current maximum, so nothing is
//! overwritten.

mod schedule;
mod sink;

pub use schedule::{BackupPlan, next_backup_plan};
pub use sink::{BackupSink, JsonFileBackupSink};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Options;
use crate::containers::ContainerRegistry;
use crate::error::Result;
use crate::groups::GroupStore;
use crate::host::TabQuery;
use crate::migration;
use crate::models::{
    ContainerDetails, Group, GroupId, Hotkey, PinnedTab, TEMPORARY_CONTAINER, Tab, TabSession,
    is_url_allowed_to_create,
};
use crate::state::SessionState;
use crate::storage::{CURRENT_VERSION, StoredData};
use crate::tabs::{NewTab, TabOps};
use crate::windows;

/// Tab entry of a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupTab {
    /// Url
    pub url: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Container, omitted for the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_store_id: Option<String>,
    /// Favicon and thumbnail, when opted in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<TabSession>,
}

/// Group entry of a backup, settings plus tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupGroup {
    /// Group settings
    #[serde(flatten)]
    pub group: Group,
    /// Tabs in display order
    #[serde(default)]
    pub tabs: Vec<BackupTab>,
}

/// Backup document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    /// Data format version
    pub version: String,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Groups with tabs
    #[serde(default)]
    pub groups: Vec<BackupGroup>,
    /// Highest group id the source ever assigned
    #[serde(default)]
    pub last_created_group_position: u32,
    /// Keyboard shortcuts
    #[serde(default)]
    pub hotkeys: Vec<Hotkey>,
    /// Pinned tabs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_tabs: Option<Vec<PinnedTab>>,
    /// Containers referenced by groups and tabs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, ContainerDetails>,
    /// User options
    #[serde(flatten)]
    pub options: Options,
}

impl BackupData {
    /// Parses a backup, upgrading documents written by older versions
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and a migration
    /// error for documents from a newer release.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let migrated = migration::migrate(value)?;
        Ok(serde_json::from_value(Value::Object(migrated.data))?)
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of tabs over all groups
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.groups.iter().map(|g| g.tabs.len()).sum()
    }

    /// Short description of the contents
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Groups: {}, Tabs: {}, Pinned tabs: {}, Hotkeys: {}, Containers: {}",
            self.groups.len(),
            self.tab_count(),
            self.pinned_tabs.as_ref().map_or(0, Vec::len),
            self.hotkeys.len(),
            self.containers.len()
        )
    }
}

/// What a backup includes beyond groups and options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupOptions {
    /// Tab thumbnails
    pub include_thumbnails: bool,
    /// Tab favicons
    pub include_fav_icons: bool,
}

impl BackupOptions {
    /// Options configured for automatic backups
    #[must_use]
    pub const fn auto(options: &Options) -> Self {
        Self {
            include_thumbnails: options.auto_backup_include_tab_thumbnails,
            include_fav_icons: options.auto_backup_include_tab_fav_icons,
        }
    }
}

/// Outcome of a restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Groups added
    pub groups: usize,
    /// Open tabs adopted by a restored group
    pub matched_tabs: usize,
    /// Tabs created for a restored group
    pub created_tabs: usize,
    /// Pinned tabs created
    pub pinned_tabs: usize,
}

/// Result of merging a backup into the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBackup {
    /// Document to persist
    pub data: StoredData,
    /// Incoming groups with their new ids, tabs included
    pub groups: Vec<BackupGroup>,
    /// Pinned tabs carried by the backup
    pub pinned_tabs: Vec<PinnedTab>,
}

/// Merges a backup into the current document
///
/// Incoming groups are appended with ids numbered after the larger of both
/// documents' last positions. Hotkeys bound to an incoming group follow its
/// new id. Options come from the backup.
#[must_use]
pub fn merge_backup(current: StoredData, backup: BackupData) -> MergedBackup {
    let mut position = current
        .last_created_group_position
        .max(backup.last_created_group_position)
        .max(current.groups.iter().map(|g| g.id.0).max().unwrap_or(0));

    let mut id_map: HashMap<GroupId, GroupId> = HashMap::new();
    let groups: Vec<BackupGroup> = backup
        .groups
        .into_iter()
        .map(|mut entry| {
            position += 1;
            let new_id = GroupId(position);
            id_map.insert(entry.group.id, new_id);
            entry.group.id = new_id;
            if entry.group.title.trim().is_empty() {
                entry.group.title = format!("Group {new_id}");
            }
            entry.tabs.retain(|tab| is_url_allowed_to_create(&tab.url, false));
            entry
        })
        .collect();

    let hotkeys = backup.hotkeys.into_iter().map(|mut hotkey| {
        if let Some(old) = hotkey.group_id {
            hotkey.group_id = id_map.get(&old).copied().or(Some(old));
        }
        hotkey
    });

    let mut data = current;
    data.version = CURRENT_VERSION.to_string();
    data.last_created_group_position = position;
    data.groups
        .extend(groups.iter().map(|entry| entry.group.without_tabs()));
    data.hotkeys.extend(hotkeys);
    data.options = Options {
        auto_backup_last_backup_time_stamp: data.options.auto_backup_last_backup_time_stamp,
        ..backup.options
    };

    MergedBackup {
        data,
        groups,
        pinned_tabs: backup.pinned_tabs.unwrap_or_default(),
    }
}

/// Rewrites container ids of incoming groups and tabs
pub fn remap_containers(groups: &mut [BackupGroup], mapping: &HashMap<String, String>) {
    let map = |id: &mut String| {
        if let Some(local) = mapping.get(id.as_str()) {
            id.clone_from(local);
        }
    };

    for entry in groups {
        if let Some(container) = entry.group.new_tab_container.as_mut() {
            map(container);
        }
        entry.group.catch_tab_containers.iter_mut().for_each(&map);
        for tab in &mut entry.tabs {
            if let Some(container) = tab.cookie_store_id.as_mut() {
                map(container);
            }
        }
    }
}

/// Creates and restores backups against the live host
pub struct Backups {
    state: Arc<SessionState>,
    store: Arc<GroupStore>,
    tabs: Arc<TabOps>,
}

impl Backups {
    /// Creates the service
    #[must_use]
    pub fn new(state: Arc<SessionState>, store: Arc<GroupStore>, tabs: Arc<TabOps>) -> Self {
        Self { state, store, tabs }
    }

    /// Snapshots the document and the tabs of every group
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn create(&self, options: BackupOptions) -> Result<BackupData> {
        let data = self.store.load_data().await?;
        let groups = self.store.load_with_tabs().await?;

        let pinned: Vec<PinnedTab> = self
            .tabs
            .query(TabQuery::all().pinned(true))
            .await?
            .into_iter()
            .filter(|tab| !self.state.is_window_ignored(tab.window_id))
            .filter(|tab| is_url_allowed_to_create(&tab.url, false))
            .map(|tab| PinnedTab {
                cookie_store_id: non_default(&tab.cookie_store_id),
                url: tab.url,
                title: tab.title,
            })
            .collect();

        let mut referenced: Vec<String> = Vec::new();
        let groups: Vec<BackupGroup> = groups
            .into_iter()
            .map(|group| {
                let tabs = group
                    .tabs
                    .iter()
                    .filter(|tab| !tab.url.is_empty())
                    .map(|tab| backup_tab(tab, options))
                    .collect::<Vec<_>>();
                referenced.extend(tabs.iter().filter_map(|t| t.cookie_store_id.clone()));
                referenced.extend(group.catch_tab_containers.iter().cloned());
                referenced.extend(group.new_tab_container.clone());
                BackupGroup {
                    group: group.without_tabs(),
                    tabs,
                }
            })
            .collect();

        let containers = referenced
            .into_iter()
            .filter(|id| id != TEMPORARY_CONTAINER)
            .filter_map(|id| {
                let container = self.state.containers.get(&id)?;
                Some((id, container.details()))
            })
            .collect();

        let backup = BackupData {
            version: CURRENT_VERSION.to_string(),
            created_at: Some(Utc::now()),
            groups,
            last_created_group_position: data.last_created_group_position,
            hotkeys: data.hotkeys,
            pinned_tabs: (!pinned.is_empty()).then_some(pinned),
            containers,
            options: data.options,
        };
        tracing::info!(groups = backup.groups.len(), tabs = backup.tab_count(), "Backup created");
        Ok(backup)
    }

    /// Merges a backup into the session
    ///
    /// Events are paused for the whole restore. Open tabs matching a backup
    /// tab by url and container join the restored group; the rest are
    /// created hidden. Missing pinned tabs are opened. The document is
    /// stored with the restore marker set; the caller is expected to run
    /// startup again.
    ///
    /// # Errors
    ///
    /// Returns a storage or host error. Tabs created before the failure
    /// stay open.
    pub async fn restore(&self, backup: BackupData) -> Result<RestoreSummary> {
        let _pause = self.state.gate.pause();

        let mapping = self.state.containers.restore(&backup.containers).await?;
        let mut backup = backup;
        remap_containers(&mut backup.groups, &mapping);

        let current = self.store.load_data().await?;
        let mut merged = merge_backup(current, backup);
        normalize_group_containers(&self.state.containers, &mut merged.data.groups);

        let mut summary = RestoreSummary {
            groups: merged.groups.len(),
            ..RestoreSummary::default()
        };

        let mut pool: Vec<Tab> = windows::load_with_tabs(&self.state)
            .await?
            .into_iter()
            .flat_map(|w| w.tabs)
            .filter(|t| !t.pinned)
            .collect();

        let mut to_create = Vec::new();
        for entry in &merged.groups {
            for tab in &entry.tabs {
                let cookie_store_id = self.state.containers.normalize(tab.cookie_store_id.as_deref());
                let found = pool
                    .iter()
                    .position(|t| t.url == tab.url && t.cookie_store_id == cookie_store_id);

                if let Some(index) = found {
                    let open = pool.swap_remove(index);
                    self.state.cache.set_tab_group(open.id, Some(entry.group.id));
                    summary.matched_tabs += 1;
                } else {
                    to_create.push(NewTab {
                        url: Some(tab.url.clone()),
                        title: Some(tab.title.clone()),
                        discarded: true,
                        cookie_store_id: Some(cookie_store_id),
                        group_id: Some(entry.group.id),
                        fav_icon_url: tab.session.as_ref().and_then(|s| s.fav_icon_url.clone()),
                        thumbnail: tab.session.as_ref().and_then(|s| s.thumbnail.clone()),
                        ..NewTab::default()
                    });
                }
            }
        }
        summary.created_tabs = self.tabs.create_tabs_safe(to_create, true, false).await?.len();

        let open_pinned = self.tabs.query(TabQuery::all().pinned(true)).await?;
        let pinned: Vec<NewTab> = merged
            .pinned_tabs
            .iter()
            .filter(|p| is_url_allowed_to_create(&p.url, false))
            .filter(|p| !open_pinned.iter().any(|t| t.url == p.url))
            .map(|p| NewTab {
                url: Some(p.url.clone()),
                title: Some(p.title.clone()),
                pinned: true,
                cookie_store_id: p.cookie_store_id.clone(),
                ..NewTab::default()
            })
            .collect();
        summary.pinned_tabs = self.tabs.create_tabs_safe(pinned, false, false).await?.len();

        let mut data = merged.data;
        data.is_backup_restoring = true;
        self.store
            .update(move |stored| {
                *stored = data;
                Ok(())
            })
            .await?;

        tracing::info!(
            groups = summary.groups,
            matched = summary.matched_tabs,
            created = summary.created_tabs,
            pinned = summary.pinned_tabs,
            "Backup restored"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for Backups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backups").finish_non_exhaustive()
    }
}

/// Drops references to containers the host does not know
///
/// The temporary marker is kept; a default container as group container
/// becomes none.
pub fn normalize_group_containers(containers: &ContainerRegistry, groups: &mut [Group]) {
    for group in groups {
        if let Some(container) = group.new_tab_container.take() {
            let normalized = containers.normalize(Some(&container));
            group.new_tab_container =
                (!ContainerRegistry::is_default(Some(&normalized))).then_some(normalized);
        }
        group
            .catch_tab_containers
            .retain(|id| containers.get(id).is_some());
    }
}

fn non_default(cookie_store_id: &str) -> Option<String> {
    (!ContainerRegistry::is_default(Some(cookie_store_id))).then(|| cookie_store_id.to_string())
}

fn backup_tab(tab: &Tab, options: BackupOptions) -> BackupTab {
    let session = (options.include_thumbnails || options.include_fav_icons).then(|| TabSession {
        group_id: None,
        fav_icon_url: options
            .include_fav_icons
            .then(|| tab.session.fav_icon_url.clone())
            .flatten(),
        thumbnail: options
            .include_thumbnails
            .then(|| tab.session.thumbnail.clone())
            .flatten(),
    });

    BackupTab {
        url: tab.url.clone(),
        title: tab.title.clone(),
        cookie_store_id: non_default(&tab.cookie_store_id),
        session,
    }
}
