//! Placeholder download tests against the local container
//!
//! Run with: cargo test --test download_tests -- --nocapture

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use aurora_backup_core::adapters::LocalSyncContainer;
use aurora_backup_core::domain::remote::placeholder_name;
use aurora_backup_core::domain::RemoteEntry;
use aurora_backup_core::ports::{DownloadOptions, RemoteContainerGateway};
use aurora_backup_core::{CancelToken, Error};

const NAME: &str = "Tari-Aurora-Backup_2024-01-01_00-00-00.zip";

fn options(timeout: Duration) -> DownloadOptions {
    DownloadOptions {
        timeout,
        poll_interval: Duration::from_millis(10),
    }
}

/// Returns the container and the listed placeholder entry
fn container_with_placeholder(temp_dir: &TempDir) -> (LocalSyncContainer, RemoteEntry) {
    let root = temp_dir.path().to_path_buf();
    fs::write(root.join(placeholder_name(NAME)), b"").unwrap();
    let container = LocalSyncContainer::new("iCloud.test", &root);
    let entry = container
        .list_entries(&root)
        .unwrap()
        .into_iter()
        .find(|e| e.is_placeholder)
        .unwrap();
    (container, entry)
}

#[tokio::test]
async fn test_materialized_entry_returns_immediately() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(NAME), b"zip").unwrap();
    let container = LocalSyncContainer::new("iCloud.test", temp_dir.path());
    let entry = container.list_entries(temp_dir.path()).unwrap().remove(0);

    let path = container
        .download(&entry, options(Duration::from_millis(1)), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(path, temp_dir.path().join(NAME));
}

#[tokio::test]
async fn test_placeholder_download_completes() {
    let temp_dir = TempDir::new().unwrap();
    let (container, entry) = container_with_placeholder(&temp_dir);
    assert_eq!(entry.materialized_name(), NAME);

    let target = temp_dir.path().join(NAME);
    let writer = target.clone();
    let incoming = temp_dir.path().join("incoming.part");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&incoming, b"content").unwrap();
        fs::rename(&incoming, writer).unwrap();
    });

    let path = container
        .download(&entry, options(Duration::from_secs(5)), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(path, target);
    assert_eq!(fs::read(path).unwrap(), b"content");
}

#[tokio::test(start_paused = true)]
async fn test_download_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let (container, entry) = container_with_placeholder(&temp_dir);

    let result = container
        .download(&entry, options(Duration::from_secs(30)), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(Error::DownloadTimedOut(d)) if d == Duration::from_secs(30)));
}

#[tokio::test]
async fn test_download_cancelled() {
    let temp_dir = TempDir::new().unwrap();
    let (container, entry) = container_with_placeholder(&temp_dir);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = container
        .download(&entry, options(Duration::from_secs(60)), &cancel)
        .await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_vanished_placeholder_forwards_error() {
    let temp_dir = TempDir::new().unwrap();
    let (container, entry) = container_with_placeholder(&temp_dir);
    fs::remove_file(&entry.path).unwrap();

    let result = container
        .download(&entry, options(Duration::from_secs(1)), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(Error::Io(_))));
}
