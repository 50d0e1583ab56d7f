//! Window lookups with their session overlay
//!
//! Only normal, non-private windows are managed. Every window returned here
//! carries its hydrated [`WindowSession`](crate::models::WindowSession).

use crate::error::{Result, TabGroupsError};
use crate::host::TabQuery;
use crate::models::{Tab, Window, WindowId};
use crate::state::SessionState;

/// Window with its unpinned tabs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowWithTabs {
    /// The window
    pub window: Window,
    /// Unpinned tabs, in index order, hydrated
    pub tabs: Vec<Tab>,
}

/// Managed windows, sorted by id
///
/// # Errors
///
/// Returns the host error if windows cannot be listed.
pub async fn load(state: &SessionState) -> Result<Vec<Window>> {
    let mut windows = Vec::new();
    for window in state.ports.windows.get_all().await? {
        if window.is_allowed() {
            windows.push(state.cache.load_window_session(window).await);
        }
    }
    windows.sort_by_key(|w| w.id);
    Ok(windows)
}

/// Managed windows with their unpinned tabs
///
/// # Errors
///
/// Returns the host error if windows or tabs cannot be listed.
pub async fn load_with_tabs(state: &SessionState) -> Result<Vec<WindowWithTabs>> {
    let mut result = Vec::new();
    for window in load(state).await? {
        let query = TabQuery::in_window(window.id).pinned(false);
        let mut tabs = Vec::new();
        for tab in state.ports.tabs.query(query).await? {
            tabs.push(state.cache.load_tab_session(tab).await);
        }
        result.push(WindowWithTabs { window, tabs });
    }
    Ok(result)
}

/// One managed window
///
/// # Errors
///
/// Returns [`TabGroupsError::NoNormalWindow`] for popups and private
/// windows, or the host error if the window is gone.
pub async fn get(state: &SessionState, window_id: WindowId) -> Result<Window> {
    let window = state.ports.windows.get(window_id).await?;
    if !window.is_allowed() {
        return Err(TabGroupsError::NoNormalWindow);
    }
    Ok(state.cache.load_window_session(window).await)
}

/// The window actions apply to
///
/// Prefers the host's last focused window. When that one is not a normal
/// window, falls back to the focused managed window, then to the managed
/// window listed last by the host.
///
/// # Errors
///
/// Returns [`TabGroupsError::NoNormalWindow`] if no managed window exists.
pub async fn last_focused_normal(state: &SessionState) -> Result<Window> {
    match state.ports.windows.get_last_focused().await {
        Ok(window) if window.is_allowed() => {
            return Ok(state.cache.load_window_session(window).await);
        }
        Ok(window) => {
            tracing::debug!(window_id = %window.id, "Last focused window is not a normal window");
        }
        Err(e) => tracing::debug!(error = %e, "No last focused window"),
    }

    let windows = load(state).await?;
    windows
        .iter()
        .find(|w| w.focused)
        .or_else(|| windows.last())
        .cloned()
        .ok_or(TabGroupsError::NoNormalWindow)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Settings;
    use crate::host::{HostPorts, InMemoryHost, WindowPort};
    use crate::storage::MemoryStorage;

    fn state(host: &Arc<InMemoryHost>) -> SessionState {
        SessionState::new(
            HostPorts::in_memory(host, Arc::new(MemoryStorage::new())),
            Settings::default(),
        )
    }

    #[tokio::test]
    async fn popups_are_not_managed() {
        let host = Arc::new(InMemoryHost::new());
        let normal = host.seed_window();
        host.seed_tab(normal, "https://a.test");
        host.open_popup();
        let state = state(&host);

        let windows = load(&state).await.unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].id, normal);
    }

    #[tokio::test]
    async fn last_focused_falls_back_to_normal_window() {
        let host = Arc::new(InMemoryHost::new());
        let first = host.seed_window();
        let popup = host.open_popup();
        host.focus(popup).await.unwrap();
        let state = state(&host);

        let window = last_focused_normal(&state).await.unwrap();
        assert_eq!(window.id, first);
    }

    #[tokio::test]
    async fn no_windows_is_an_error() {
        let host = Arc::new(InMemoryHost::new());
        let state = state(&host);
        assert!(matches!(
            last_focused_normal(&state).await,
            Err(TabGroupsError::NoNormalWindow)
        ));
    }

    #[tokio::test]
    async fn tabs_exclude_pinned() {
        let host = Arc::new(InMemoryHost::new());
        let w = host.seed_window();
        host.seed_tab(w, "https://a.test");
        host.seed_tab(w, "https://b.test");
        let state = state(&host);
        let pinned = host.tabs()[0].id;
        crate::host::TabPort::update(
            host.as_ref(),
            pinned,
            crate::host::TabUpdate {
                pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let loaded = load_with_tabs(&state).await.unwrap();
        assert_eq!(loaded[0].tabs.len(), 1);
        assert_ne!(loaded[0].tabs[0].id, pinned);
    }
}
