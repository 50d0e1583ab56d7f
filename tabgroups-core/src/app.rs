//! The engine
//!
//! [`TabGroups`] owns one session: it wires every component over a single
//! [`SessionState`], runs startup reconciliation and exposes the operations
//! UI surfaces call. Nothing is global; two engines over two hosts never
//! share state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::apply::GroupApplier;
use crate::backup::{
    BackupData, BackupOptions, BackupSink, Backups, RestoreSummary, next_backup_plan,
    normalize_group_containers,
};
use crate::config::{Options, Settings};
use crate::error::{InitError, Result, TabGroupsError};
use crate::groups::{GroupManager, GroupStore, GroupUpdates};
use crate::host::{CreateWindowProps, HostPorts, TabQuery};
use crate::messages::BgMessage;
use crate::migration;
use crate::models::{GroupId, GroupPatch, Tab, TabId, WindowId, WindowKind};
use crate::router::{EventRouter, RouterDeps};
use crate::state::SessionState;
use crate::storage::StoredData;
use crate::tabs::{NewTab, TabOps};
use crate::toolbar::{MenuCommand, Toolbar};
use crate::tracing::span_names;
use crate::windows::{self, WindowWithTabs};

/// Context of a menu click
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuContext {
    /// Tab the menu was opened on
    pub tab_id: Option<TabId>,
    /// Link under the cursor
    pub link_url: Option<String>,
    /// Link text
    pub link_title: Option<String>,
}

/// A tab-organizer session over one host
pub struct TabGroups {
    pub(crate) state: Arc<SessionState>,
    pub(crate) tabs: Arc<TabOps>,
    pub(crate) store: Arc<GroupStore>,
    pub(crate) toolbar: Arc<Toolbar>,
    pub(crate) updates: Arc<GroupUpdates>,
    pub(crate) applier: Arc<GroupApplier>,
    pub(crate) manager: Arc<GroupManager>,
    backups: Arc<Backups>,
    backup_sink: Mutex<Option<Arc<dyn BackupSink>>>,
    auto_backup: Mutex<Option<JoinHandle<()>>>,
}

impl TabGroups {
    /// Wires the components and attaches the event router
    ///
    /// Events are not delivered before [`init`](Self::init) succeeds.
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(ports: HostPorts, settings: Settings) -> Self {
        let state = Arc::new(SessionState::new(ports, settings));
        let tabs = Arc::new(TabOps::new(Arc::clone(&state)));
        let store = Arc::new(GroupStore::new(Arc::clone(&state)));
        let toolbar = Arc::new(Toolbar::new(Arc::clone(&state), Arc::clone(&store)));
        let updates = Arc::new(GroupUpdates::spawn(&state, Arc::clone(&store)));
        let applier = Arc::new(GroupApplier::new(
            Arc::clone(&state),
            Arc::clone(&tabs),
            Arc::clone(&store),
            Arc::clone(&toolbar),
            Arc::clone(&updates),
        ));
        let manager = Arc::new(GroupManager::new(
            Arc::clone(&state),
            Arc::clone(&tabs),
            Arc::clone(&store),
            Arc::clone(&toolbar),
            Arc::clone(&updates),
            Arc::clone(&applier),
        ));
        let backups = Arc::new(Backups::new(
            Arc::clone(&state),
            Arc::clone(&store),
            Arc::clone(&tabs),
        ));

        let router = EventRouter::new(RouterDeps {
            state: Arc::clone(&state),
            tabs: Arc::clone(&tabs),
            store: Arc::clone(&store),
            manager: Arc::clone(&manager),
            applier: Arc::clone(&applier),
            updates: Arc::clone(&updates),
            toolbar: Arc::clone(&toolbar),
        });
        state.gate.attach(Arc::new(router));

        Self {
            state,
            tabs,
            store,
            toolbar,
            updates,
            applier,
            manager,
            backups,
            backup_sink: Mutex::new(None),
            auto_backup: Mutex::new(None),
        }
    }

    /// Shared session state
    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Group lifecycle operations
    #[must_use]
    pub fn manager(&self) -> &Arc<GroupManager> {
        &self.manager
    }

    /// Group switching
    #[must_use]
    pub fn applier(&self) -> &Arc<GroupApplier> {
        &self.applier
    }

    /// Group persistence
    #[must_use]
    pub fn store(&self) -> &Arc<GroupStore> {
        &self.store
    }

    /// Tab operations
    #[must_use]
    pub fn tabs(&self) -> &Arc<TabOps> {
        &self.tabs
    }

    /// Returns true once startup finished
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.bus.is_ready()
    }

    /// Sets where automatic backups are written
    ///
    /// Takes effect on the next [`init`](Self::init) or options change.
    pub fn set_backup_sink(&self, sink: Arc<dyn BackupSink>) {
        *lock(&self.backup_sink) = Some(sink);
    }

    /// Runs startup
    ///
    /// Reads and upgrades the document, reconciles every window with its
    /// loaded group, refreshes toolbars and menus, then starts event
    /// delivery and announces `i-am-back`. On failure the help page is
    /// opened and the error returned; events stay off.
    ///
    /// # Errors
    ///
    /// Returns an [`InitError`] when the session cannot start.
    pub async fn init(&self) -> std::result::Result<(), InitError> {
        let span = tracing::info_span!(span_names::INIT);
        let result = self.startup().instrument(span).await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "Startup failed");
            self.state.notify(e.to_string()).await;
            let help = NewTab {
                url: Some(self.state.settings.help_page_url()),
                active: true,
                ..NewTab::default()
            };
            if let Err(open_error) = self.tabs.create(help).await {
                tracing::warn!(error = %open_error, "Failed to open help page");
            }
        }
        result
    }

    async fn startup(&self) -> std::result::Result<(), InitError> {
        self.toolbar.set_loading(None).await;
        let storage = Arc::clone(&self.state.ports.storage);

        let raw = storage
            .get_all()
            .await
            .map_err(InitError::StorageUnreadable)?;
        self.state.containers.init().await?;

        let migrated = migration::migrate(Value::Object(raw)).map_err(InitError::Migration)?;
        if !migrated.removed_keys.is_empty() {
            let keys: Vec<&str> = migrated.removed_keys.iter().map(String::as_str).collect();
            storage
                .remove(&keys)
                .await
                .map_err(TabGroupsError::from)?;
        }

        let mut data = StoredData::from_map(migrated.data).map_err(InitError::StorageUnreadable)?;
        normalize_group_containers(&self.state.containers, &mut data.groups);
        self.state.set_options(data.options.clone());

        let windows = windows::load_with_tabs(&self.state).await?;
        if windows.is_empty() {
            return Err(InitError::NoWindows);
        }
        let known: Vec<GroupId> = data.groups.iter().map(|g| g.id).collect();
        self.reconcile(&known, windows).await?;

        if data.is_backup_restoring {
            data.is_backup_restoring = false;
            storage
                .remove(&["isBackupRestoring"])
                .await
                .map_err(TabGroupsError::from)?;
            self.state.notify("Backup successfully restored").await;
        }
        data.save(storage.as_ref())
            .await
            .map_err(TabGroupsError::from)?;

        for window in windows::load(&self.state).await? {
            self.toolbar.update(window.id).await?;
            if let Some(group_id) = window.session.group_id {
                self.state.with_history(|history| history.add(group_id));
            }
        }
        self.toolbar.rebuild_menus(None).await?;

        self.state.gate.arm();
        self.state.bus.set_ready(true);
        self.state.send_external(&BgMessage::IAmBack);
        self.state.send(BgMessage::IAmBack);
        self.restart_auto_backup();

        tracing::info!(groups = known.len(), "Startup finished");
        Ok(())
    }

    // Brings every window in line with its loaded group: its tabs shown,
    // tabs of other groups hidden or moved to the window that has their
    // group loaded, unknown group ids dropped
    async fn reconcile(&self, known: &[GroupId], windows: Vec<WindowWithTabs>) -> Result<()> {
        let cache = &self.state.cache;
        let is_known = |id: GroupId| known.contains(&id);

        let mut loaded: BTreeMap<GroupId, WindowId> = BTreeMap::new();
        for entry in &windows {
            match entry.window.session.group_id {
                Some(group_id) if is_known(group_id) => {
                    loaded.insert(group_id, entry.window.id);
                }
                Some(group_id) => {
                    tracing::debug!(window_id = %entry.window.id, group_id = %group_id, "Window group no longer exists");
                    cache.remove_window_group(entry.window.id);
                }
                None => {}
            }
        }

        for entry in windows {
            let window_id = entry.window.id;
            let window_group = entry.window.session.group_id.filter(|g| is_known(*g));

            let mut shown: Vec<Tab> = Vec::new();
            let mut to_show: Vec<TabId> = Vec::new();
            let mut to_hide: Vec<TabId> = Vec::new();
            let mut to_move: BTreeMap<WindowId, Vec<TabId>> = BTreeMap::new();
            let mut hides_active = false;

            for tab in entry.tabs {
                let mut group_id = tab.group_id();
                if let Some(id) = group_id
                    && !is_known(id)
                {
                    cache.remove_tab_group(tab.id);
                    group_id = None;
                }

                match (group_id, window_group) {
                    (Some(id), Some(current)) if id == current => {
                        if tab.hidden {
                            to_show.push(tab.id);
                        }
                        shown.push(tab);
                        continue;
                    }
                    (None, Some(current)) if !tab.hidden => {
                        cache.set_tab_group(tab.id, Some(current));
                        shown.push(tab);
                        continue;
                    }
                    (Some(id), _) => {
                        if let Some(&target) = loaded.get(&id)
                            && target != window_id
                        {
                            to_move.entry(target).or_default().push(tab.id);
                            if tab.hidden {
                                to_show.push(tab.id);
                            }
                            continue;
                        }
                    }
                    (None, _) => continue,
                }

                if !tab.hidden {
                    hides_active |= tab.active;
                    to_hide.push(tab.id);
                }
            }

            for (target, ids) in to_move {
                self.tabs.move_native(&ids, target, None).await?;
            }
            self.tabs.show(&to_show).await?;

            if !to_hide.is_empty() {
                if hides_active {
                    let visible: Vec<Tab> = shown.iter().filter(|t| !to_hide.contains(&t.id)).cloned().collect();
                    if visible.is_empty() {
                        self.tabs.create_temp_active_tab(window_id, false).await?;
                    } else {
                        self.tabs.set_active(None, &visible).await?;
                    }
                }
                self.tabs.hide(&to_hide).await?;
            }
            tracing::debug!(
                window_id = %window_id,
                group_id = ?window_group,
                hidden = to_hide.len(),
                "Window reconciled"
            );
        }
        Ok(())
    }

    /// Validates and stores changed options
    ///
    /// Broadcasts `options-updated` and refreshes whatever depends on the
    /// changed keys.
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::Config`] for unknown keys or invalid values,
    /// or a storage error.
    pub async fn save_options(&self, patch: &Map<String, Value>) -> Result<Options> {
        let previous = self.state.options();
        let options = previous.merge(patch)?;

        let stored = options.clone();
        self.store
            .update(move |data| {
                data.options = stored;
                Ok(())
            })
            .await?;
        self.state.set_options(options.clone());
        self.state.send(BgMessage::OptionsUpdated);
        tracing::info!(keys = ?patch.keys().collect::<Vec<_>>(), "Options saved");

        if previous.prepend_group_title_to_window_title != options.prepend_group_title_to_window_title {
            self.toolbar.update_all().await?;
        }
        if previous.show_context_menu_on_tabs != options.show_context_menu_on_tabs
            || previous.show_context_menu_on_links != options.show_context_menu_on_links
        {
            self.toolbar.rebuild_menus(None).await?;
        }
        if patch.keys().any(|key| key.starts_with("autoBackup")) {
            self.restart_auto_backup();
        }
        Ok(options)
    }

    /// Shows every tab, forgets all session values and empties storage
    ///
    /// The engine is left stopped; call [`init`](Self::init) to start over.
    ///
    /// # Errors
    ///
    /// Returns a host or storage error.
    pub async fn clear(&self) -> Result<()> {
        self.stop();
        self.toolbar.set_loading(None).await;

        let tabs = self.state.ports.tabs.query(TabQuery::all()).await?;
        for tab in &tabs {
            self.state.cache.forget_tab_values(tab.id).await;
        }
        for window in self.state.ports.windows.get_all().await? {
            self.state.cache.forget_window_values(window.id).await;
        }
        self.state.ports.storage.clear().await?;

        let hidden: Vec<TabId> = tabs.iter().filter(|t| t.hidden).map(|t| t.id).collect();
        self.tabs.show(&hidden).await?;

        self.state.cache.clear();
        self.state.trash.clear();
        tracing::info!(tabs = tabs.len(), "Session cleared");
        Ok(())
    }

    fn stop(&self) {
        self.state.gate.disarm();
        self.state.bus.set_ready(false);
        if let Some(task) = lock(&self.auto_backup).take() {
            task.abort();
        }
    }

    /// Stops event delivery and background work
    ///
    /// The router is detached so the session can be dropped.
    pub fn shutdown(&self) {
        self.stop();
        self.state.gate.detach();
        tracing::info!("Session shut down");
    }

    /// Snapshots groups, tabs and options
    ///
    /// # Errors
    ///
    /// Returns a storage or host error.
    pub async fn create_backup(&self, options: BackupOptions) -> Result<BackupData> {
        self.backups.create(options).await
    }

    /// Merges a backup into the session and starts it again
    ///
    /// # Errors
    ///
    /// Returns a storage or host error from the restore, or
    /// [`TabGroupsError::Config`] if startup fails afterwards.
    pub async fn restore_backup(&self, backup: BackupData) -> Result<RestoreSummary> {
        let span = tracing::info_span!(span_names::RESTORE_BACKUP, groups = backup.groups.len());
        async {
            self.stop();
            self.toolbar.set_loading(None).await;
            let summary = self.backups.restore(backup).await?;
            self.init()
                .await
                .map_err(|e| TabGroupsError::Config(format!("restart after restore failed: {e}")))?;
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    fn restart_auto_backup(&self) {
        let mut task = lock(&self.auto_backup);
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let Some(sink) = lock(&self.backup_sink).clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);
        let backups = Arc::clone(&self.backups);
        *task = Some(handle.spawn(async move {
            loop {
                let options = state.options();
                let plan = match next_backup_plan(&options, Utc::now().timestamp()) {
                    Ok(Some(plan)) => plan,
                    Ok(None) => return,
                    Err(e) => {
                        state.reporter.record("auto backup", &e);
                        return;
                    }
                };

                if plan.due_now
                    && let Err(e) = auto_backup(&state, &store, &backups, sink.as_ref(), plan.overwrite).await
                {
                    state.reporter.report("auto backup", &e).await;
                }
                tokio::time::sleep(plan.next_in).await;
            }
        }));
    }

    /// Handles a click on one of the engine's context menu entries
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::InvalidAction`] for unknown entries or a
    /// missing tab, or the error of the operation.
    pub async fn on_menu_click(&self, menu_id: &str, context: MenuContext) -> Result<()> {
        let command = MenuCommand::parse(menu_id)
            .ok_or_else(|| TabGroupsError::InvalidAction(format!("unknown menu entry '{menu_id}'")))?;
        let tab_id = || {
            context
                .tab_id
                .ok_or_else(|| TabGroupsError::InvalidAction("menu clicked without a tab".to_string()))
        };

        match command {
            MenuCommand::MoveTab(group_id) => {
                let group = self.store.load(group_id).await?;
                self.manager
                    .move_tabs(&[tab_id()?], group_id, group.show_tab_after_moving_it_into_this_group)
                    .await?;
            }
            MenuCommand::MoveTabToNewGroup => {
                self.manager.add(None, &[tab_id()?], None, false).await?;
            }
            MenuCommand::OpenLink(group_id) => {
                self.open_link(group_id, &context).await?;
            }
            MenuCommand::OpenLinkInNewGroup => {
                let group = self.manager.add(None, &[], None, false).await?;
                self.open_link(group.id, &context).await?;
            }
            MenuCommand::SetTabIconAsGroupIcon => {
                let tab = self.tabs.get(tab_id()?).await?;
                let group_id = self
                    .state
                    .cache
                    .get_window_group(tab.window_id)
                    .ok_or_else(|| TabGroupsError::InvalidAction("no group in this window".to_string()))?;
                let icon = tab.session.fav_icon_url.clone().or(tab.fav_icon_url);
                self.manager
                    .update(
                        group_id,
                        GroupPatch {
                            icon_url: Some(icon),
                            ..GroupPatch::default()
                        },
                    )
                    .await?;
            }
            MenuCommand::UndoRemoveGroup(group_id) => {
                self.manager.restore_removed(group_id).await?;
            }
        }
        Ok(())
    }

    async fn open_link(&self, group_id: GroupId, context: &MenuContext) -> Result<()> {
        let url = context
            .link_url
            .clone()
            .ok_or_else(|| TabGroupsError::InvalidAction("menu clicked without a link".to_string()))?;
        let group = self.store.load(group_id).await?;

        let group_window = self.state.cache.get_window_id(group_id);
        let window_id = match group_window {
            Some(id) => id,
            None => windows::last_focused_normal(&self.state).await?.id,
        };

        let mut tab = NewTab::in_group(&group).with_url(url);
        tab.title.clone_from(&context.link_title);
        tab.window_id = Some(window_id);
        let created = self.tabs.create(tab).await?;

        if group_window.is_none() {
            self.tabs.hide_excluded(&[created.id]).await?;
        }
        self.updates.schedule(group_id);

        if group.show_tab_after_moving_it_into_this_group {
            self.applier
                .apply_group(Some(window_id), group_id, Some(created.id), false)
                .await;
        }
        Ok(())
    }

    /// Shows the manage page, reusing an open one
    ///
    /// Opens in a tab or in a popup window depending on the user option.
    ///
    /// # Errors
    ///
    /// Returns a host error.
    pub async fn open_manage_groups(&self) -> Result<()> {
        let url = self.state.settings.manage_page_url();

        if self.state.options().open_manage_groups_in_tab {
            let window = windows::last_focused_normal(&self.state).await?;
            let existing = self
                .tabs
                .query(TabQuery::in_window(window.id).hidden(false))
                .await?
                .into_iter()
                .find(|t| self.state.settings.is_manage_page(&t.url));

            match existing {
                Some(tab) => {
                    self.tabs.set_active(Some(tab.id), &[]).await?;
                }
                None => {
                    self.tabs
                        .create(NewTab {
                            url: Some(url),
                            window_id: Some(window.id),
                            active: true,
                            ..NewTab::default()
                        })
                        .await?;
                }
            }
            return Ok(());
        }

        for window in self.state.ports.windows.get_all().await? {
            if window.kind != WindowKind::Popup {
                continue;
            }
            let tabs = self
                .state
                .ports
                .tabs
                .query(TabQuery::in_window(window.id))
                .await?;
            if tabs.iter().any(|t| self.state.settings.is_manage_page(&t.url)) {
                self.state.ports.windows.focus(window.id).await?;
                return Ok(());
            }
        }

        let window = self
            .state
            .ports
            .windows
            .create(CreateWindowProps {
                url: Some(url),
                focused: true,
            })
            .await?;
        tracing::debug!(window_id = %window.id, "Manage window opened");
        Ok(())
    }
}

impl Drop for TabGroups {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TabGroups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabGroups")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

async fn auto_backup(
    state: &SessionState,
    store: &GroupStore,
    backups: &Backups,
    sink: &dyn BackupSink,
    overwrite: bool,
) -> Result<()> {
    let options = state.options();
    let backup = backups.create(BackupOptions::auto(&options)).await?;

    if !backup.groups.is_empty() {
        sink.write(&backup, true, overwrite).await?;
    }

    let now = Utc::now().timestamp();
    store
        .update(move |data| {
            data.options.auto_backup_last_backup_time_stamp = now;
            Ok(())
        })
        .await?;
    state.set_options(Options {
        auto_backup_last_backup_time_stamp: now,
        ..state.options()
    });
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
