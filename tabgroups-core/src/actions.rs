//! Action vocabulary shared by hotkeys, UI pages and partner extensions
//!
//! Requests are JSON objects tagged by `action`, e.g.
//! `{"action": "load-custom-group", "groupId": 3}`. Every request yields an
//! [`ActionResponse`]; failures never escape as errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::app::TabGroups;
use crate::apply::Step;
use crate::error::{Result, TabGroupsError};
use crate::models::{Group, GroupId, GroupSummary, Tab, TabId};
use crate::tabs::{NewTab, TabOps};
use crate::toolbar::{group_icon, slice_text};
use crate::tracing::span_names;
use crate::windows;

const ERROR_PREFIX: &str = "[STG] ";
const NOT_LOADED: &str = "I am not yet loaded";
const NOT_WHITELISTED: &str = "Your extension/action does not in white list. If you want to add your extension/action to white list - please contact with me.";
const NO_CURRENT_GROUP: &str = "There are no group in the current window";

/// Group reference in a request: an id or `"new"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawGroupRef")]
pub enum GroupRef {
    /// Existing group
    Id(GroupId),
    /// Create a group first
    New,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGroupRef {
    Number(u32),
    Text(String),
}

impl TryFrom<RawGroupRef> for GroupRef {
    type Error = String;

    fn try_from(raw: RawGroupRef) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawGroupRef::Number(0) => Err("groupId must be positive".to_string()),
            RawGroupRef::Number(id) => Ok(Self::Id(GroupId(id))),
            RawGroupRef::Text(text) if text == "new" => Ok(Self::New),
            RawGroupRef::Text(text) => match text.parse::<u32>() {
                Ok(id) if id > 0 => Ok(Self::Id(GroupId(id))),
                _ => Err(format!("invalid groupId '{text}'")),
            },
        }
    }
}

/// A command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Liveness probe
    AreYouHere,
    /// Lists groups
    GetGroupsList,
    /// Loads the next group
    LoadNextGroup,
    /// Loads the previous group
    LoadPrevGroup,
    /// Loads the next group not loaded in any window
    LoadNextUnloadedGroup,
    /// Loads the previous group not loaded in any window
    LoadPrevUnloadedGroup,
    /// Goes forward in the group history
    LoadHistoryNextGroup,
    /// Goes back in the group history
    LoadHistoryPrevGroup,
    /// Loads the first group
    LoadFirstGroup,
    /// Loads the last group
    LoadLastGroup,
    /// Loads a given group
    #[serde(rename_all = "camelCase")]
    LoadCustomGroup {
        /// Target
        #[serde(default)]
        group_id: Option<GroupRef>,
    },
    /// Creates a group
    AddNewGroup {
        /// Title of the new group
        #[serde(default)]
        title: Option<String>,
    },
    /// Removes the group of the current window
    DeleteCurrentGroup,
    /// Moves the active tab into a group
    #[serde(rename_all = "camelCase")]
    MoveActiveTabToCustomGroup {
        /// Target
        #[serde(default)]
        group_id: Option<GroupRef>,
    },
    /// Unloads the tabs of a group
    #[serde(rename_all = "camelCase")]
    DiscardGroup {
        /// Group to discard
        #[serde(default)]
        group_id: Option<GroupId>,
    },
    /// Unloads the tabs of every group except the current one
    DiscardOtherGroups,
    /// Reloads the tabs of the current group
    ReloadAllTabsInCurrentGroup,
    /// Opens a tab in the current group
    #[serde(rename_all = "camelCase")]
    CreateNewTab {
        /// Container override
        #[serde(default)]
        cookie_store_id: Option<String>,
    },
    /// Shows the manage page
    OpenManageGroups,
}

const ACTION_NAMES: &[&str] = &[
    "are-you-here",
    "get-groups-list",
    "load-next-group",
    "load-prev-group",
    "load-next-unloaded-group",
    "load-prev-unloaded-group",
    "load-history-next-group",
    "load-history-prev-group",
    "load-first-group",
    "load-last-group",
    "load-custom-group",
    "add-new-group",
    "delete-current-group",
    "move-active-tab-to-custom-group",
    "discard-group",
    "discard-other-groups",
    "reload-all-tabs-in-current-group",
    "create-new-tab",
    "open-manage-groups",
];

impl Action {
    /// Wire name of the action
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AreYouHere => "are-you-here",
            Self::GetGroupsList => "get-groups-list",
            Self::LoadNextGroup => "load-next-group",
            Self::LoadPrevGroup => "load-prev-group",
            Self::LoadNextUnloadedGroup => "load-next-unloaded-group",
            Self::LoadPrevUnloadedGroup => "load-prev-unloaded-group",
            Self::LoadHistoryNextGroup => "load-history-next-group",
            Self::LoadHistoryPrevGroup => "load-history-prev-group",
            Self::LoadFirstGroup => "load-first-group",
            Self::LoadLastGroup => "load-last-group",
            Self::LoadCustomGroup { .. } => "load-custom-group",
            Self::AddNewGroup { .. } => "add-new-group",
            Self::DeleteCurrentGroup => "delete-current-group",
            Self::MoveActiveTabToCustomGroup { .. } => "move-active-tab-to-custom-group",
            Self::DiscardGroup { .. } => "discard-group",
            Self::DiscardOtherGroups => "discard-other-groups",
            Self::ReloadAllTabsInCurrentGroup => "reload-all-tabs-in-current-group",
            Self::CreateNewTab { .. } => "create-new-tab",
            Self::OpenManageGroups => "open-manage-groups",
        }
    }

    /// Returns true if `name` is a known action
    #[must_use]
    pub fn is_known(name: &str) -> bool {
        ACTION_NAMES.contains(&name)
    }

    /// Parses a JSON request
    ///
    /// # Errors
    ///
    /// Returns [`TabGroupsError::InvalidAction`] for a missing or unknown
    /// action, or malformed arguments.
    pub fn from_request(request: Value) -> Result<Self> {
        let name = request
            .get("action")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| TabGroupsError::InvalidAction("Action or it's id is empty".to_string()))?
            .to_string();

        if !Self::is_known(&name) {
            return Err(TabGroupsError::InvalidAction(format!("Action '{name}' is wrong")));
        }
        serde_json::from_value(request)
            .map_err(|e| TabGroupsError::InvalidAction(format!("Action '{name}' is malformed: {e}")))
    }
}

/// Result of an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    /// Action succeeded
    pub ok: bool,
    /// Error text, prefixed with `[STG]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Groups, for `get-groups-list`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups_list: Option<Vec<GroupSummary>>,
    /// Created group, for `add-new-group`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupSummary>,
}

impl ActionResponse {
    const fn ok(ok: bool) -> Self {
        Self {
            ok,
            error: None,
            groups_list: None,
            group: None,
        }
    }

    fn error(message: &str) -> Self {
        Self {
            error: Some(format!("{ERROR_PREFIX}{message}")),
            ..Self::default()
        }
    }

    fn from_error(error: &TabGroupsError) -> Self {
        match error {
            TabGroupsError::InvalidAction(message) => Self::error(message),
            other => Self::error(&other.to_string()),
        }
    }
}

/// Group as shown to partners, with its resolved icon
#[must_use]
pub fn external_summary(group: &Group) -> GroupSummary {
    GroupSummary {
        icon_url: Some(group_icon(group)),
        ..group.summary()
    }
}

// Window the action runs against, with its loaded group and all groups
struct ActionContext {
    window_id: crate::models::WindowId,
    current: Option<Group>,
    groups: Vec<Group>,
}

impl ActionContext {
    fn current_id(&self) -> Option<GroupId> {
        self.current.as_ref().map(|g| g.id)
    }

    fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(|g| g.id).collect()
    }

    fn has_group(&self, group_id: GroupId) -> bool {
        self.groups.iter().any(|g| g.id == group_id)
    }
}

impl TabGroups {
    /// Runs an action from a hotkey, a UI page or a partner extension
    ///
    /// `external_id` names the partner extension, if any.
    pub async fn run_action(&self, request: Value, external_id: Option<&str>) -> ActionResponse {
        let action = match Action::from_request(request) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected action");
                return ActionResponse::from_error(&e);
            }
        };

        let span = tracing::info_span!(
            span_names::RUN_ACTION,
            action = action.name(),
            external = external_id.unwrap_or(""),
        );
        let name = action.name();
        match self.dispatch(action, external_id).instrument(span).await {
            Ok(response) => response,
            Err(e) => {
                self.state.reporter.record(name, &e);
                ActionResponse::from_error(&e)
            }
        }
    }

    /// Handles a request from a partner extension
    ///
    /// Refused before startup finished and for senders or actions outside
    /// the whitelist.
    pub async fn handle_external(&self, sender: &str, request: Value) -> ActionResponse {
        if !self.is_ready() {
            return ActionResponse::error(NOT_LOADED);
        }

        let allowed = request
            .get("action")
            .and_then(Value::as_str)
            .zip(self.state.settings.external_extension(sender))
            .is_some_and(|(action, extension)| extension.allows(action));
        if !allowed {
            tracing::info!(sender, "External request refused");
            return ActionResponse::error(NOT_WHITELISTED);
        }

        self.run_action(request, Some(sender)).await
    }

    async fn context(&self, with_tabs: bool) -> Result<ActionContext> {
        let window = windows::last_focused_normal(&self.state).await?;
        let groups = if with_tabs {
            self.store.load_with_tabs().await?
        } else {
            self.store.load_all().await?
        };
        let current = window
            .session
            .group_id
            .and_then(|id| groups.iter().find(|g| g.id == id).cloned());

        Ok(ActionContext {
            window_id: window.id,
            current,
            groups,
        })
    }

    async fn dispatch(&self, action: Action, external_id: Option<&str>) -> Result<ActionResponse> {
        let with_tabs = matches!(
            action,
            Action::DiscardGroup { .. } | Action::DiscardOtherGroups | Action::ReloadAllTabsInCurrentGroup
        );
        let ctx = self.context(with_tabs).await?;

        let ok = match action {
            Action::AreYouHere => true,
            Action::GetGroupsList => {
                return Ok(ActionResponse {
                    groups_list: Some(ctx.groups.iter().map(external_summary).collect()),
                    ..ActionResponse::ok(true)
                });
            }
            Action::LoadNextGroup => {
                self.applier
                    .apply_by_position(Step::Next, &ctx.group_ids(), ctx.current_id())
                    .await
            }
            Action::LoadPrevGroup => {
                self.applier
                    .apply_by_position(Step::Prev, &ctx.group_ids(), ctx.current_id())
                    .await
            }
            Action::LoadNextUnloadedGroup => {
                let ids = self.unloaded_group_ids(&ctx);
                self.applier
                    .apply_by_position(Step::Next, &ids, ctx.current_id())
                    .await
            }
            Action::LoadPrevUnloadedGroup => {
                let ids = self.unloaded_group_ids(&ctx);
                self.applier
                    .apply_by_position(Step::Prev, &ids, ctx.current_id())
                    .await
            }
            Action::LoadHistoryNextGroup => {
                self.applier
                    .apply_by_history(Step::Next, &ctx.group_ids())
                    .await
            }
            Action::LoadHistoryPrevGroup => {
                self.applier
                    .apply_by_history(Step::Prev, &ctx.group_ids())
                    .await
            }
            Action::LoadFirstGroup => match ctx.groups.first() {
                Some(group) => self.apply_in(&ctx, group.id).await,
                None => false,
            },
            Action::LoadLastGroup => match ctx.groups.last() {
                Some(group) => self.apply_in(&ctx, group.id).await,
                None => false,
            },
            Action::LoadCustomGroup { group_id } => match group_id {
                Some(GroupRef::Id(id)) if ctx.has_group(id) => self.apply_in(&ctx, id).await,
                Some(GroupRef::Id(id)) => return Err(TabGroupsError::GroupNotFound(id)),
                Some(GroupRef::New) => {
                    let group = self.manager.add(None, &[], None, false).await?;
                    self.apply_in(&ctx, group.id).await
                }
                None => return Err(group_id_required()),
            },
            Action::AddNewGroup { title } => {
                let group = self.manager.add(None, &[], title, false).await?;
                return Ok(ActionResponse {
                    group: Some(external_summary(&group)),
                    ..ActionResponse::ok(true)
                });
            }
            Action::DeleteCurrentGroup => {
                let Some(current) = ctx.current else {
                    if external_id.is_some() {
                        self.state.notify(NO_CURRENT_GROUP).await;
                    }
                    return Err(TabGroupsError::InvalidAction(NO_CURRENT_GROUP.to_string()));
                };
                self.manager.remove(current.id).await?;
                if let Some(extension) = external_id.and_then(|id| self.state.settings.external_extension(id)) {
                    self.state
                        .notify(format!(
                            "Group \"{}\" was removed by the \"{}\" extension",
                            current.title, extension.title
                        ))
                        .await;
                }
                true
            }
            Action::MoveActiveTabToCustomGroup { group_id } => {
                let Some(tab) = self.movable_active_tab(&ctx).await? else {
                    return Ok(ActionResponse::ok(false));
                };
                match group_id {
                    Some(GroupRef::Id(id)) if ctx.has_group(id) => {
                        let show = ctx
                            .groups
                            .iter()
                            .find(|g| g.id == id)
                            .is_some_and(|g| g.show_tab_after_moving_it_into_this_group);
                        self.manager.move_tabs(&[tab.id], id, show).await?;
                    }
                    Some(GroupRef::Id(id)) => return Err(TabGroupsError::GroupNotFound(id)),
                    Some(GroupRef::New) => {
                        self.manager.add(None, &[tab.id], None, false).await?;
                    }
                    None => return Err(group_id_required()),
                }
                true
            }
            Action::DiscardGroup { group_id } => {
                let group_id = group_id.ok_or_else(group_id_required)?;
                let group = ctx
                    .groups
                    .iter()
                    .find(|g| g.id == group_id)
                    .ok_or(TabGroupsError::GroupNotFound(group_id))?;
                self.tabs.discard(&tab_ids(&group.tabs)).await?;
                true
            }
            Action::DiscardOtherGroups => {
                let current = ctx.current_id();
                let ids: Vec<TabId> = ctx
                    .groups
                    .iter()
                    .filter(|g| Some(g.id) != current)
                    .flat_map(|g| g.tabs.iter().map(|t| t.id))
                    .collect();
                self.tabs.discard(&ids).await?;
                true
            }
            Action::ReloadAllTabsInCurrentGroup => match &ctx.current {
                Some(current) => {
                    self.tabs.reload(&tab_ids(&current.tabs), false).await?;
                    true
                }
                None => false,
            },
            Action::CreateNewTab { cookie_store_id } => {
                let mut tab = ctx.current.as_ref().map(NewTab::in_group).unwrap_or_default();
                tab.window_id = Some(ctx.window_id);
                tab.active = true;
                if cookie_store_id.is_some() {
                    tab.cookie_store_id = cookie_store_id;
                }
                self.tabs.create(tab).await?;
                true
            }
            Action::OpenManageGroups => {
                self.open_manage_groups().await?;
                true
            }
        };

        Ok(ActionResponse::ok(ok))
    }

    async fn apply_in(&self, ctx: &ActionContext, group_id: GroupId) -> bool {
        self.applier
            .apply_group(Some(ctx.window_id), group_id, None, false)
            .await
    }

    // Groups loaded nowhere, plus the current one as the starting point
    fn unloaded_group_ids(&self, ctx: &ActionContext) -> Vec<GroupId> {
        let current = ctx.current_id();
        ctx.groups
            .iter()
            .filter(|g| Some(g.id) == current || !self.state.is_group_loaded(g.id))
            .map(|g| g.id)
            .collect()
    }

    // Active tab of the action window, or None after telling the user why
    // it cannot be moved
    async fn movable_active_tab(&self, ctx: &ActionContext) -> Result<Option<Tab>> {
        let Some(tab) = self.tabs.get_active(ctx.window_id).await? else {
            return Ok(None);
        };
        if tab.pinned {
            self.state.notify("Pinned tabs are not supported").await;
            return Ok(None);
        }
        if !TabOps::is_can_be_hidden(&tab) {
            let title = if tab.title.is_empty() { &tab.url } else { &tab.title };
            self.state
                .notify(format!("Tab \"{}\" can not be hidden", slice_text(title, 25)))
                .await;
            return Ok(None);
        }
        Ok(Some(tab))
    }
}

fn group_id_required() -> TabGroupsError {
    TabGroupsError::InvalidAction("groupId is required".to_string())
}

fn tab_ids(tabs: &[Tab]) -> Vec<TabId> {
    tabs.iter().map(|t| t.id).collect()
}
