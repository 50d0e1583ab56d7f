//! Startup, group switching, shutdown and restart

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tabgroups_core::host::{HostCall, TabPort};
use tabgroups_core::models::SharingState;
use tabgroups_core::{
    CURRENT_VERSION, GroupId, InMemoryHost, InitError, MemoryStorage, StorageAdapter, StoredData,
    TabId, WindowId,
};

use super::support::{engine, started};

fn window_one() -> WindowId {
    WindowId(1)
}

#[tokio::test]
async fn startup_on_empty_storage_stamps_the_document() {
    let session = started(&["https://a.test", "https://b.test"]).await;

    assert!(session.app.is_ready());
    assert!(session.app.state().gate.is_listening());
    assert_eq!(session.host.listener_count(), 1);

    let stored = StoredData::load(session.storage.as_ref()).await.unwrap();
    assert_eq!(stored.version, CURRENT_VERSION);
    assert!(stored.groups.is_empty());
}

#[tokio::test]
async fn startup_without_windows_fails_and_tells_the_user() {
    let host = Arc::new(InMemoryHost::new());
    let storage = Arc::new(MemoryStorage::new());
    let app = engine(&host, &storage);

    let err = app.init().await.unwrap_err();

    assert!(matches!(err, InitError::NoWindows));
    assert!(!app.is_ready());
    assert!(!host.notifications().is_empty());
    assert_eq!(host.listener_count(), 0);
}

#[tokio::test]
async fn startup_refuses_data_from_a_newer_release() {
    let host = Arc::new(InMemoryHost::new());
    host.seed_window();
    let storage = Arc::new(MemoryStorage::new());
    let mut doc = Map::new();
    doc.insert("version".to_string(), json!("9.0"));
    storage.set(doc).await.unwrap();

    let app = engine(&host, &storage);
    let err = app.init().await.unwrap_err();

    assert!(matches!(err, InitError::Migration(_)));
    assert!(!app.is_ready());
}

#[tokio::test]
async fn startup_upgrades_old_documents() {
    let host = Arc::new(InMemoryHost::new());
    host.seed_window();
    let storage = Arc::new(MemoryStorage::new());
    let mut doc = Map::new();
    doc.insert("version".to_string(), json!("4.1"));
    doc.insert("groups".to_string(), json!([{"id": 3, "title": "Old"}]));
    doc.insert("lastCreatedGroupPosition".to_string(), json!(3));
    doc.insert("followToLoadedGroupInSideBar".to_string(), Value::Bool(true));
    storage.set(doc).await.unwrap();

    let app = engine(&host, &storage);
    app.init().await.unwrap();

    let all = storage.get_all().await.unwrap();
    assert_eq!(all["version"], CURRENT_VERSION);
    assert!(!all.contains_key("followToLoadedGroupInSideBar"));

    let groups = app.store().load_all().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, GroupId(3));
    assert!(groups[0].if_not_default_container_re_open_in_new);
}

#[tokio::test]
async fn new_group_adopts_the_window_tabs() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let app = &session.app;

    let group = app
        .manager()
        .add(Some(window_one()), &[], Some("Work".to_string()), false)
        .await
        .unwrap();

    assert_eq!(group.id, GroupId(1));
    assert_eq!(group.title, "Work");
    assert_eq!(app.state().cache.get_window_group(window_one()), Some(group.id));

    let loaded = app.store().load_one_with_tabs(group.id).await.unwrap();
    let urls: Vec<&str> = loaded.tabs.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.test", "https://b.test"]);
}

#[tokio::test]
async fn switching_groups_hides_and_shows_tabs() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let w = window_one();
    let original = host.visible_tabs(w);

    let work = app.manager().add(Some(w), &[], None, false).await.unwrap();
    let empty = app.manager().add(None, &[], None, false).await.unwrap();

    assert!(app.applier().apply_group(Some(w), empty.id, None, false).await);
    host.settle().await;

    let visible = host.visible_tabs(w);
    assert_eq!(visible.len(), 1, "a blank tab keeps the window usable");
    assert!(original.iter().all(|id| host.tab(*id).unwrap().hidden));
    assert_eq!(app.state().cache.get_window_group(w), Some(empty.id));
    assert_eq!(app.state().cache.tab_group(visible[0]), Some(empty.id));

    assert!(app.applier().apply_group(Some(w), work.id, None, false).await);
    host.settle().await;

    assert_eq!(host.visible_tabs(w), original);
    assert_eq!(app.state().cache.get_window_id(work.id), Some(w));
    assert_eq!(app.state().cache.get_window_id(empty.id), None);
    assert!(app.state().gate.is_listening());
}

#[tokio::test]
async fn concurrent_switches_in_one_window_are_exclusive() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let w = window_one();

    app.manager().add(Some(w), &[], None, false).await.unwrap();
    let a = app.manager().add(None, &[], None, false).await.unwrap();
    let b = app.manager().add(None, &[], None, false).await.unwrap();
    host.set_latency(Some(Duration::from_millis(5)));

    let (first, second) = tokio::join!(
        app.applier().apply_group(Some(w), a.id, None, false),
        app.applier().apply_group(Some(w), b.id, None, false),
    );
    host.set_latency(None);
    host.settle().await;

    assert!(first);
    assert!(!second);
    assert!(!app.applier().is_loading(w));
    assert_eq!(app.state().cache.get_window_group(w), Some(a.id));
    assert_eq!(app.state().cache.get_window_id(b.id), None);
}

#[tokio::test]
async fn reapplying_the_loaded_group_touches_no_tabs() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let w = window_one();
    let work = app.manager().add(Some(w), &[], None, false).await.unwrap();
    let visible = host.visible_tabs(w);
    host.clear_calls();

    assert!(app.applier().apply_group(Some(w), work.id, None, false).await);
    host.settle().await;

    assert!(
        !host
            .calls()
            .iter()
            .any(|call| matches!(call, HostCall::HideTabs(_) | HostCall::ShowTabs(_)))
    );
    assert_eq!(host.visible_tabs(w), visible);
    assert_eq!(app.state().cache.get_window_group(w), Some(work.id));
}

#[tokio::test]
async fn sharing_tab_blocks_the_switch() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let w = window_one();
    let work = app.manager().add(Some(w), &[], None, false).await.unwrap();
    let other = app.manager().add(None, &[], None, false).await.unwrap();
    host.set_sharing(
        TabId(2),
        SharingState {
            camera: true,
            ..SharingState::default()
        },
    );
    let visible = host.visible_tabs(w);
    let notified = host.notifications().len();
    let history = app.state().with_history(|h| h.len());

    assert!(!app.applier().apply_group(Some(w), other.id, None, false).await);
    host.settle().await;

    assert_eq!(host.notifications().len(), notified + 1);
    assert_eq!(app.state().cache.get_window_group(w), Some(work.id));
    assert_eq!(app.state().cache.get_window_id(other.id), None);
    assert_eq!(host.visible_tabs(w), visible);
    assert_eq!(app.state().with_history(|h| h.len()), history);
}

#[tokio::test]
async fn restart_reconciles_tabs_shown_behind_its_back() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, storage) = (Arc::clone(&session.host), Arc::clone(&session.storage));
    let w = window_one();
    let original = host.visible_tabs(w);

    let app = session.app;
    app.manager().add(Some(w), &[], None, false).await.unwrap();
    let other = app.manager().add(None, &[], None, false).await.unwrap();
    assert!(app.applier().apply_group(Some(w), other.id, None, false).await);
    host.settle().await;
    let expected = host.visible_tabs(w);

    app.shutdown();
    drop(app);
    assert_eq!(host.listener_count(), 0);

    TabPort::show(host.as_ref(), &original).await.unwrap();
    assert_eq!(host.visible_tabs(w).len(), 3);

    let restarted = engine(&host, &storage);
    restarted.init().await.unwrap();
    host.settle().await;

    assert_eq!(host.visible_tabs(w), expected);
    assert_eq!(restarted.state().cache.get_window_group(w), Some(other.id));
}

#[tokio::test]
async fn shutdown_stops_event_delivery() {
    let session = started(&["https://a.test"]).await;

    session.app.shutdown();

    assert!(!session.app.is_ready());
    assert!(!session.app.state().gate.is_listening());
    assert_eq!(session.host.listener_count(), 0);
}

#[tokio::test]
async fn saving_options_validates_keys() {
    let session = started(&["https://a.test"]).await;
    let app = &session.app;

    let mut patch = Map::new();
    patch.insert("discardTabsAfterHide".to_string(), json!(true));
    let options = app.save_options(&patch).await.unwrap();
    assert!(options.discard_tabs_after_hide);
    assert!(app.state().options().discard_tabs_after_hide);

    let stored = StoredData::load(session.storage.as_ref()).await.unwrap();
    assert!(stored.options.discard_tabs_after_hide);

    let mut bad = Map::new();
    bad.insert("noSuchOption".to_string(), json!(1));
    assert!(app.save_options(&bad).await.is_err());
}

#[tokio::test]
async fn clearing_shows_every_tab_and_empties_storage() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let w = window_one();
    let original = host.visible_tabs(w);

    app.manager().add(Some(w), &[], None, false).await.unwrap();
    let other = app.manager().add(None, &[], None, false).await.unwrap();
    assert!(app.applier().apply_group(Some(w), other.id, None, false).await);
    host.settle().await;

    app.clear().await.unwrap();

    assert!(!app.is_ready());
    assert!(original.iter().all(|id| !host.tab(*id).unwrap().hidden));
    assert!(session.storage.get_all().await.unwrap().is_empty());
}
