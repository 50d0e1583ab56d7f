//! Action vocabulary and the partner extension boundary

use std::sync::Arc;

use serde_json::json;
use tabgroups_core::{GroupId, InMemoryHost, MemoryStorage, WindowId};

use super::support::{engine, started};

const W: WindowId = WindowId(1);
const LOAD_CUSTOM_GROUP_PLUGIN: &str = "stg-plugin-load-custom-group@drive4ik";

#[tokio::test]
async fn are_you_here() {
    let session = started(&["https://a.test"]).await;
    let response = session
        .app
        .run_action(json!({"action": "are-you-here"}), None)
        .await;
    assert!(response.ok);
    assert_eq!(response.error, None);
}

#[tokio::test]
async fn unknown_actions_are_reported() {
    let session = started(&["https://a.test"]).await;
    let response = session
        .app
        .run_action(json!({"action": "make-coffee"}), None)
        .await;
    assert!(!response.ok);
    assert_eq!(
        response.error.as_deref(),
        Some("[STG] Action 'make-coffee' is wrong")
    );
}

#[tokio::test]
async fn external_requests_wait_for_startup() {
    let host = Arc::new(InMemoryHost::new());
    host.seed_window();
    let app = engine(&host, &Arc::new(MemoryStorage::new()));

    let response = app
        .handle_external(LOAD_CUSTOM_GROUP_PLUGIN, json!({"action": "are-you-here"}))
        .await;
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("[STG] I am not yet loaded"));
}

#[tokio::test]
async fn external_requests_are_whitelisted() {
    let session = started(&["https://a.test"]).await;
    let app = &session.app;

    let stranger = app
        .handle_external("someone@else", json!({"action": "are-you-here"}))
        .await;
    assert!(!stranger.ok);
    assert!(stranger.error.unwrap().contains("white list"));

    let forbidden = app
        .handle_external(LOAD_CUSTOM_GROUP_PLUGIN, json!({"action": "delete-current-group"}))
        .await;
    assert!(!forbidden.ok);

    let allowed = app
        .handle_external(LOAD_CUSTOM_GROUP_PLUGIN, json!({"action": "are-you-here"}))
        .await;
    assert!(allowed.ok);
}

#[tokio::test]
async fn groups_list_and_new_group() {
    let session = started(&["https://a.test"]).await;
    let app = &session.app;

    let added = app
        .run_action(json!({"action": "add-new-group", "title": "Research"}), None)
        .await;
    assert!(added.ok);
    let group = added.group.unwrap();
    assert_eq!(group.id, GroupId(1));
    assert_eq!(group.title, "Research");
    assert!(group.icon_url.is_some());

    app.run_action(json!({"action": "add-new-group"}), None).await;
    let listed = app
        .run_action(json!({"action": "get-groups-list"}), None)
        .await;
    let ids: Vec<GroupId> = listed.groups_list.unwrap().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![GroupId(1), GroupId(2)]);
}

#[tokio::test]
async fn load_custom_group_needs_a_valid_id() {
    let session = started(&["https://a.test"]).await;
    let app = &session.app;

    let missing = app
        .run_action(json!({"action": "load-custom-group"}), None)
        .await;
    assert!(!missing.ok);
    assert_eq!(missing.error.as_deref(), Some("[STG] groupId is required"));

    let unknown = app
        .run_action(json!({"action": "load-custom-group", "groupId": 42}), None)
        .await;
    assert!(!unknown.ok);
    assert!(unknown.error.unwrap().contains("42"));
}

#[tokio::test]
async fn load_custom_group_new_creates_and_loads() {
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();

    let response = app
        .run_action(json!({"action": "load-custom-group", "groupId": "new"}), None)
        .await;
    host.settle().await;

    assert!(response.ok);
    assert_eq!(app.state().cache.get_window_group(W), Some(GroupId(2)));
}

#[tokio::test]
async fn next_and_prev_group_cycle() {
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();
    app.manager().add(None, &[], None, false).await.unwrap();
    app.manager().add(None, &[], None, false).await.unwrap();

    assert!(app.run_action(json!({"action": "load-next-group"}), None).await.ok);
    host.settle().await;
    assert_eq!(app.state().cache.get_window_group(W), Some(GroupId(2)));

    assert!(app.run_action(json!({"action": "load-prev-group"}), None).await.ok);
    host.settle().await;
    assert_eq!(app.state().cache.get_window_group(W), Some(GroupId(1)));

    assert!(app.run_action(json!({"action": "load-prev-group"}), None).await.ok);
    host.settle().await;
    assert_eq!(app.state().cache.get_window_group(W), Some(GroupId(3)));
}

#[tokio::test]
async fn delete_current_group_requires_a_group() {
    let session = started(&["https://a.test"]).await;
    let response = session
        .app
        .run_action(json!({"action": "delete-current-group"}), None)
        .await;
    assert!(!response.ok);
    assert_eq!(
        response.error.as_deref(),
        Some("[STG] There are no group in the current window")
    );
}

#[tokio::test]
async fn pinned_active_tab_is_not_moved() {
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();
    let target = app.manager().add(None, &[], None, false).await.unwrap();

    let tab = host.seed_tab(W, "https://pinned.test");
    tabgroups_core::host::TabPort::update(
        host.as_ref(),
        tab.id,
        tabgroups_core::host::TabUpdate {
            pinned: Some(true),
            active: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    host.settle().await;

    let response = app
        .run_action(
            json!({"action": "move-active-tab-to-custom-group", "groupId": target.id.0}),
            None,
        )
        .await;

    assert!(!response.ok);
    assert_eq!(response.error, None);
    assert!(
        host.notifications()
            .iter()
            .any(|n| n.message.contains("Pinned"))
    );
}
