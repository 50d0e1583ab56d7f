//! Creating and restoring backups through a running session

use std::sync::Arc;

use tabgroups_core::{
    BackupData, BackupOptions, BackupSink, GroupId, JsonFileBackupSink, StoredData, WindowId,
};

use super::support::started;

const W: WindowId = WindowId(1);

async fn work_backup() -> BackupData {
    let session = started(&["https://a.test", "https://b.test"]).await;
    session
        .app
        .manager()
        .add(Some(W), &[], Some("Work".to_string()), false)
        .await
        .unwrap();
    session
        .app
        .create_backup(BackupOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn backup_contains_group_tabs() {
    let backup = work_backup().await;

    assert_eq!(backup.groups.len(), 1);
    assert_eq!(backup.groups[0].group.title, "Work");
    assert_eq!(backup.last_created_group_position, 1);
    assert!(backup.created_at.is_some());

    let urls: Vec<&str> = backup.groups[0]
        .tabs
        .iter()
        .map(|t| t.url.as_str())
        .collect();
    assert_eq!(urls, vec!["https://a.test", "https://b.test"]);
    assert!(backup.groups[0].tabs.iter().all(|t| t.session.is_none()));

    let parsed = BackupData::from_json(&backup.to_json().unwrap()).unwrap();
    assert_eq!(parsed, backup);
}

#[tokio::test]
async fn restore_adopts_open_tabs_and_creates_the_rest() {
    let backup = work_backup().await;
    let session = started(&["https://a.test"]).await;
    let (host, app) = (&session.host, &session.app);

    let summary = app.restore_backup(backup).await.unwrap();
    host.settle().await;

    assert_eq!(summary.groups, 1);
    assert_eq!(summary.matched_tabs, 1);
    assert_eq!(summary.created_tabs, 1);
    assert_eq!(summary.pinned_tabs, 0);
    assert!(app.is_ready());

    let groups = app.store().load_all().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, GroupId(2));
    assert_eq!(groups[0].title, "Work");

    let restored = app.store().load_one_with_tabs(GroupId(2)).await.unwrap();
    let mut urls: Vec<&str> = restored.tabs.iter().map(|t| t.url.as_str()).collect();
    urls.sort_unstable();
    assert_eq!(urls, vec!["https://a.test", "https://b.test"]);

    let stored = StoredData::load(session.storage.as_ref()).await.unwrap();
    assert!(!stored.is_backup_restoring);
    assert_eq!(stored.last_created_group_position, 2);
    assert!(
        host.notifications()
            .iter()
            .any(|n| n.message.contains("Backup successfully restored"))
    );
}

#[tokio::test]
async fn restoring_twice_keeps_both_copies() {
    let backup = work_backup().await;
    let session = started(&["https://z.test"]).await;
    let app = &session.app;

    app.restore_backup(backup.clone()).await.unwrap();
    app.restore_backup(backup).await.unwrap();

    let ids: Vec<GroupId> = app
        .store()
        .load_all()
        .await
        .unwrap()
        .iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(ids, vec![GroupId(2), GroupId(3)]);
}

#[tokio::test]
async fn file_sink_writes_a_readable_backup() {
    let backup = work_backup().await;
    let dir = tempfile::tempdir().unwrap();
    let sink: Arc<dyn BackupSink> = Arc::new(JsonFileBackupSink::new(dir.path()));

    let path = sink.write(&backup, false, false).await.unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    let parsed = BackupData::from_json(&text).unwrap();
    assert_eq!(parsed.summary(), backup.summary());
}
