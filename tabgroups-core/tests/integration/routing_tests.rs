//! Host event routing and navigation interception

use std::sync::Arc;
use std::time::Duration;

use tabgroups_core::host::{HostCall, TabPort, TabUpdate};
use tabgroups_core::models::ChangeInfo;
use tabgroups_core::{
    BgMessage, Container, GroupPatch, HostEvent, InMemoryHost, MemoryStorage,
    NavigationVerdict, TabId, WindowId,
};
use tokio::sync::broadcast::Receiver;

use super::support::{Session, engine, started};

const W: WindowId = WindowId(1);

fn catch_docs() -> GroupPatch {
    GroupPatch {
        catch_tab_rules: Some(vec![r"docs\.test".to_string()]),
        ..GroupPatch::default()
    }
}

fn in_container(container: &Container) -> GroupPatch {
    GroupPatch {
        new_tab_container: Some(Some(container.cookie_store_id.clone())),
        ..GroupPatch::default()
    }
}

// Containers are read once at startup
async fn started_with_container(urls: &[&str]) -> (Session, Container) {
    let host = Arc::new(InMemoryHost::new());
    let window = host.seed_window();
    for url in urls {
        host.seed_tab(window, url);
    }
    let container = host.add_container("Work");
    let storage = Arc::new(MemoryStorage::new());
    let app = engine(&host, &storage);
    app.init().await.expect("startup");
    (Session { host, storage, app }, container)
}

fn removed_tabs(messages: &mut Receiver<BgMessage>) -> Vec<TabId> {
    let mut removed = Vec::new();
    while let Ok(message) = messages.try_recv() {
        if let BgMessage::TabRemoved { tab_id } = message {
            removed.push(tab_id);
        }
    }
    removed
}

fn group_tab_in(host: &InMemoryHost, container: &Container) -> Option<TabId> {
    host.tabs()
        .into_iter()
        .find(|t| t.cookie_store_id == container.cookie_store_id)
        .map(|t| t.id)
}

// Longer than the default lazy move quiet period
async fn wait_for_lazy_moves() {
    tokio::time::sleep(Duration::from_millis(350)).await;
}

#[tokio::test]
async fn user_opened_tab_joins_the_window_group() {
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let group = app.manager().add(Some(W), &[], None, false).await.unwrap();

    let tab = host.open_tab(W, "https://c.test").await.unwrap();
    host.settle().await;

    assert_eq!(app.state().cache.tab_group(tab.id), Some(group.id));
}

#[tokio::test]
async fn popup_windows_are_ignored() {
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();

    let popup = host.open_popup();
    host.settle().await;

    let popup_tab = host
        .tabs()
        .into_iter()
        .find(|t| t.window_id == popup)
        .unwrap();
    assert!(app.state().is_window_ignored(popup));
    assert!(!app.state().cache.has_tab(popup_tab.id));
}

#[tokio::test]
async fn closing_a_window_keeps_its_grouped_tabs() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let group = app.manager().add(Some(W), &[], None, false).await.unwrap();

    let second = host.open_window();
    host.settle().await;
    host.close_window(W);
    host.settle().await;

    let mut recreated: Vec<String> = host
        .tabs()
        .into_iter()
        .filter(|t| t.window_id == second && t.hidden)
        .map(|t| t.url)
        .collect();
    recreated.sort();
    assert_eq!(recreated, vec!["https://a.test", "https://b.test"]);

    let loaded = app.store().load_one_with_tabs(group.id).await.unwrap();
    assert_eq!(loaded.tabs.len(), 2);
    assert!(loaded.tabs.iter().all(|t| t.window_id == second));
    assert_eq!(app.state().cache.get_window_id(group.id), None);
}

#[tokio::test]
async fn navigation_matching_another_group_moves_the_tab() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();
    let docs = app
        .manager()
        .add(None, &[], Some("Docs".to_string()), false)
        .await
        .unwrap();
    app.manager().update(docs.id, catch_docs()).await.unwrap();

    let verdict = host.navigate(TabId(2), "https://docs.test/page", None).await;
    assert_eq!(verdict, NavigationVerdict::Allow);

    wait_for_lazy_moves().await;
    host.settle().await;

    assert_eq!(app.state().cache.tab_group(TabId(2)), Some(docs.id));
    assert!(host.tab(TabId(2)).unwrap().hidden);
    assert_eq!(host.visible_tabs(W), vec![TabId(1)]);
}

#[tokio::test]
async fn navigation_bursts_are_moved_together() {
    let session = started(&[
        "https://a.test",
        "https://b.test",
        "https://c.test",
        "https://d.test",
    ])
    .await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();
    let docs = app.manager().add(None, &[], None, false).await.unwrap();
    app.manager().update(docs.id, catch_docs()).await.unwrap();
    host.clear_calls();

    for (id, page) in [(2, "one"), (3, "two"), (4, "three"), (2, "four")] {
        host.navigate(TabId(id), &format!("https://docs.test/{page}"), None)
            .await;
    }
    wait_for_lazy_moves().await;
    host.settle().await;

    let moves: Vec<Vec<TabId>> = host
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::MoveTabs { ids, .. } => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(moves, vec![vec![TabId(2), TabId(3), TabId(4)]]);
}

#[tokio::test]
async fn sticky_groups_keep_their_tabs() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let work = app.manager().add(Some(W), &[], None, false).await.unwrap();
    app.manager()
        .update(
            work.id,
            GroupPatch {
                is_sticky: Some(true),
                ..GroupPatch::default()
            },
        )
        .await
        .unwrap();
    let docs = app.manager().add(None, &[], None, false).await.unwrap();
    app.manager().update(docs.id, catch_docs()).await.unwrap();

    host.navigate(TabId(2), "https://docs.test/page", None).await;
    wait_for_lazy_moves().await;
    host.settle().await;

    assert_eq!(app.state().cache.tab_group(TabId(2)), Some(work.id));
    assert!(!host.tab(TabId(2)).unwrap().hidden);
}

#[tokio::test]
async fn navigation_in_the_wrong_container_reopens_the_tab() {
    let (session, container) = started_with_container(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let work = app.manager().add(Some(W), &[], None, false).await.unwrap();
    app.manager()
        .update(work.id, in_container(&container))
        .await
        .unwrap();

    let verdict = host.navigate(TabId(2), "https://b.test/next", None).await;
    host.settle().await;

    assert_eq!(verdict, NavigationVerdict::Cancel);
    assert!(host.tab(TabId(2)).is_none());
    let reopened = group_tab_in(host, &container).expect("tab reopened in the container");
    let tab = host.tab(reopened).unwrap();
    assert_eq!(tab.url, "https://b.test/next");
    assert!(!tab.hidden);
    assert_eq!(app.state().cache.tab_group(reopened), Some(work.id));
    assert!(app.state().exclude.is_empty());
}

#[tokio::test]
async fn reopened_tab_of_an_unloaded_group_stays_hidden() {
    let (session, container) = started_with_container(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let work = app.manager().add(Some(W), &[], None, false).await.unwrap();
    let other = app.manager().add(None, &[], None, false).await.unwrap();
    app.manager()
        .update(work.id, in_container(&container))
        .await
        .unwrap();
    assert!(app.applier().apply_group(Some(W), other.id, None, false).await);
    host.settle().await;
    assert!(host.tab(TabId(2)).unwrap().hidden);

    let verdict = host.navigate(TabId(2), "https://b.test/next", None).await;
    host.settle().await;

    assert_eq!(verdict, NavigationVerdict::Cancel);
    assert!(host.tab(TabId(2)).is_none());
    let reopened = group_tab_in(host, &container).expect("tab reopened in the container");
    assert!(host.tab(reopened).unwrap().hidden);
    assert_eq!(app.state().cache.tab_group(reopened), Some(work.id));
    assert_eq!(app.state().cache.get_window_group(W), Some(other.id));
    assert!(app.state().exclude.is_empty());
}

#[tokio::test]
async fn navigation_started_by_another_extension_is_left_alone() {
    let (session, container) = started_with_container(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let work = app.manager().add(Some(W), &[], None, false).await.unwrap();
    app.manager()
        .update(work.id, in_container(&container))
        .await
        .unwrap();
    host.clear_calls();

    let verdict = host
        .navigate(
            TabId(2),
            "https://b.test/next",
            Some("moz-extension://other/page.html"),
        )
        .await;
    host.settle().await;

    assert_eq!(verdict, NavigationVerdict::Allow);
    assert_eq!(host.tab(TabId(2)).unwrap().url, "https://b.test/next");
    assert!(group_tab_in(host, &container).is_none());
    assert!(
        !host
            .calls()
            .iter()
            .any(|call| matches!(call, HostCall::CreateTab(_) | HostCall::RemoveTabs(_)))
    );
    assert_eq!(app.state().cache.tab_group(TabId(2)), Some(work.id));
}

#[tokio::test]
async fn pinning_takes_a_tab_out_of_its_group_and_unpinning_returns_it() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    let work = app.manager().add(Some(W), &[], None, false).await.unwrap();
    let mut messages = app.state().bus.subscribe();

    let pin = |pinned| TabUpdate {
        pinned: Some(pinned),
        ..TabUpdate::default()
    };
    TabPort::update(host.as_ref(), TabId(2), pin(true))
        .await
        .unwrap();
    host.settle().await;

    assert_eq!(app.state().cache.tab_group(TabId(2)), None);
    assert_eq!(removed_tabs(&mut messages), vec![TabId(2)]);

    TabPort::update(host.as_ref(), TabId(2), pin(false))
        .await
        .unwrap();
    host.settle().await;

    assert_eq!(app.state().cache.tab_group(TabId(2)), Some(work.id));
}

#[tokio::test]
async fn repeated_hide_event_changes_nothing() {
    let session = started(&["https://a.test", "https://b.test"]).await;
    let (host, app) = (&session.host, &session.app);
    app.manager().add(Some(W), &[], None, false).await.unwrap();
    let mut messages = app.state().bus.subscribe();

    TabPort::hide(host.as_ref(), &[TabId(2)]).await.unwrap();
    host.settle().await;
    assert_eq!(app.state().cache.tab_group(TabId(2)), None);
    assert_eq!(removed_tabs(&mut messages), vec![TabId(2)]);
    let cached = app.state().cache.tab(TabId(2));

    host.redeliver(HostEvent::TabUpdated {
        tab_id: TabId(2),
        change: ChangeInfo {
            hidden: Some(true),
            ..ChangeInfo::default()
        },
        tab: host.tab(TabId(2)).unwrap(),
    })
    .await;
    host.settle().await;

    assert_eq!(app.state().cache.tab(TabId(2)), cached);
    assert!(removed_tabs(&mut messages).is_empty());
}
