// StatusRepo tests: latest snapshot per server, superseding, reload, broadcast

mod common;

use common::*;
use servercraft::db;
use servercraft::error::StoreError;
use servercraft::models::ServerStatus;
use servercraft::status_repo::StatusRepo;
use tempfile::TempDir;
use tokio::sync::broadcast;

async fn open_repo(dir: &TempDir) -> StatusRepo {
    let path = dir.path().join("status.db");
    let pool = db::connect(path.to_str().unwrap(), 2).await.unwrap();
    let (tx, _) = broadcast::channel(16);
    let repo = StatusRepo::new(pool, tx);
    repo.init().await.unwrap();
    repo
}

#[tokio::test]
async fn status_repo_newer_snapshot_supersedes() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    assert!(repo.record(status("s1", 10.0, T0)).await.unwrap());
    assert!(repo.record(status("s1", 90.0, T1)).await.unwrap());
    let latest = repo.latest("s1").await.unwrap();
    assert_eq!(latest.cpu_percent, 90.0);
    assert_eq!(latest.timestamp, T1);
}

#[tokio::test]
async fn status_repo_older_snapshot_is_ignored() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    assert!(repo.record(status("s1", 90.0, T1)).await.unwrap());
    assert!(!repo.record(status("s1", 10.0, T0)).await.unwrap());
    assert_eq!(repo.latest("s1").await.unwrap().cpu_percent, 90.0);
}

#[tokio::test]
async fn status_repo_all_is_sorted_by_server() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    for id in ["s3", "s1", "s2"] {
        repo.record(status(id, 5.0, T0)).await.unwrap();
    }
    let ids: Vec<String> = repo.all().await.into_iter().map(|s| s.server_id).collect();
    assert_eq!(ids, ["s1", "s2", "s3"]);
    assert!(repo.latest("s9").await.is_none());
}

#[tokio::test]
async fn status_repo_rejects_invalid_snapshot() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let bad = ServerStatus::observed("s1", true, 150.0, 0.0, 0.0, T0);
    assert!(matches!(
        repo.record(bad).await.unwrap_err(),
        StoreError::Schema(_)
    ));
    assert!(repo.all().await.is_empty());
}

#[tokio::test]
async fn status_repo_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let repo = open_repo(&dir).await;
        repo.record(status("s1", 10.0, T0)).await.unwrap();
        repo.record(status("s1", 20.0, T1)).await.unwrap();
        repo.record(status("s2", 30.0, T0)).await.unwrap();
    }
    let repo = open_repo(&dir).await;
    assert!(repo.all().await.is_empty());
    assert_eq!(repo.load().await.unwrap(), 2);
    assert_eq!(repo.latest("s1").await.unwrap().cpu_percent, 20.0);
    assert_eq!(repo.latest("s2").await.unwrap().cpu_percent, 30.0);
}

#[tokio::test]
async fn status_repo_broadcasts_recorded_snapshots() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let mut rx = repo.subscribe();
    repo.record(status("s1", 90.0, T1)).await.unwrap();
    // ignored snapshots are not broadcast
    repo.record(status("s1", 10.0, T0)).await.unwrap();
    let received = rx.recv().await.unwrap();
    assert_eq!(received.cpu_percent, 90.0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn status_repo_concurrent_records_keep_newest() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let snapshots: Vec<ServerStatus> = [3, 0, 5, 1, 4, 2]
        .into_iter()
        .map(|h| status("s1", h as f64 * 10.0, &format!("2024-05-01T1{}:00:00Z", h)))
        .collect();
    let readers = async {
        for _ in 0..10 {
            let _ = repo.all().await;
            tokio::task::yield_now().await;
        }
    };
    let writers = futures_util::future::join_all(snapshots.into_iter().map(|s| repo.record(s)));
    let (results, ()) = tokio::join!(writers, readers);
    assert!(results.iter().all(Result::is_ok));
    let latest = repo.latest("s1").await.unwrap();
    assert_eq!(latest.timestamp, "2024-05-01T15:00:00Z");
    assert_eq!(latest.cpu_percent, 50.0);

    drop(repo);
    let reopened = open_repo(&dir).await;
    reopened.load().await.unwrap();
    assert_eq!(
        reopened.latest("s1").await.unwrap().timestamp,
        "2024-05-01T15:00:00Z"
    );
}
