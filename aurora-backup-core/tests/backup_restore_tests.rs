//! End-to-end backup and restore through a local synchronized container
//!
//! These tests drive `BackupContext` the way the CLI does: real archives,
//! a real directory standing in for the container, real change watches and
//! the DuckDB event log.
//!
//! Run with: cargo test --test backup_restore_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use aurora_backup_core::adapters::DirectoryWallet;
use aurora_backup_core::services::{ArchiveCodec, BackupObserver, EntryPoint};
use aurora_backup_core::{
    BackupContext, CancelToken, Error, SyncProgress, SyncState, WalletIdentity,
};

const KEY: &str = "f00dbabe";
const DB_NAME: &str = "tari_wallet.sqlite3";

// ============================================================================
// Test Helpers
// ============================================================================

/// Context with a fast watch interval so uploads settle quickly
fn create_context(temp_dir: &TempDir) -> BackupContext {
    create_context_with(temp_dir, serde_json::json!({}))
}

fn create_context_with(temp_dir: &TempDir, extra: serde_json::Value) -> BackupContext {
    let mut settings = serde_json::json!({"watchIntervalMs": 20, "pollIntervalMs": 10});
    if let (Some(settings), Some(extra)) = (settings.as_object_mut(), extra.as_object()) {
        settings.extend(extra.clone());
    }
    fs::write(
        temp_dir.path().join("settings.json"),
        serde_json::to_string(&settings).unwrap(),
    )
    .unwrap();
    BackupContext::new(temp_dir.path(), EntryPoint::Cli).expect("Failed to create context")
}

fn create_wallet(ctx: &BackupContext, content: &[u8]) -> DirectoryWallet {
    let db_dir = ctx.database_directory();
    fs::create_dir_all(&db_dir).unwrap();
    fs::write(db_dir.join(DB_NAME), content).unwrap();
    DirectoryWallet::new(Some(WalletIdentity::parse(KEY).unwrap()), db_dir)
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<SyncProgress>>,
}

impl BackupObserver for Recorder {
    fn on_backup_progress(&self, progress: &SyncProgress) {
        self.seen.lock().push(progress.clone());
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

fn wallet_content() -> Vec<u8> {
    (0..20_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
}

// ============================================================================
// Backup Tests
// ============================================================================

/// A backup lands in the container, the watch reports it uploaded, and the
/// staging directory is cleaned up afterwards
#[tokio::test]
async fn test_backup_upload_completes() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let wallet = create_wallet(&ctx, &wallet_content());

    let recorder = Arc::new(Recorder::default());
    ctx.engine.add_observer(&recorder);

    assert!(!ctx.engine.is_backup_present(&wallet));
    let archive = ctx.engine.create_backup(&wallet).await.unwrap();
    assert!(ctx.engine.is_backup_present(&wallet));

    let remote = temp_dir
        .path()
        .join("container/Tari-Wallet-Backups")
        .join(KEY)
        .join(&archive.name);
    assert!(remote.is_file());
    assert_eq!(ArchiveCodec::digest(&remote).unwrap(), archive.sha256);

    let staging = ctx.engine.scratch_dir().to_path_buf();
    wait_until(|| ctx.engine.state() == SyncState::Completed && !staging.exists()).await;

    let seen = recorder.seen.lock().clone();
    assert_eq!(seen.first().map(|p| p.percent), Some(0.0));
    let last = seen.last().unwrap();
    assert!(last.completed);
    assert_eq!(last.percent, 100.0);
    assert!(!ctx.engine.in_progress());
}

/// Backups are recorded in the event log without wallet content
#[tokio::test]
async fn test_backup_events_are_logged() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let wallet = create_wallet(&ctx, b"db");
    let logging = ctx.logging.clone().expect("event log should open");

    let archive = ctx.engine.create_backup(&wallet).await.unwrap();
    wait_until(|| {
        logging
            .get_recent(10)
            .unwrap()
            .iter()
            .any(|e| e.event == "upload_completed")
    })
    .await;

    let entries = logging.get_recent(10).unwrap();
    let created = entries.iter().find(|e| e.event == "backup_created").unwrap();
    assert_eq!(created.wallet_folder.as_deref(), Some(KEY));
    assert_eq!(created.archive.as_deref(), Some(archive.name.as_str()));
    assert_eq!(created.entry_point, "cli");
    assert!(logging.get_errors(10).unwrap().is_empty());
}

/// Each backup adds a timestamped archive instead of overwriting
#[tokio::test]
async fn test_backups_accumulate_and_prune() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let wallet = create_wallet(&ctx, b"db");

    ctx.engine.create_backup(&wallet).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    ctx.engine.create_backup(&wallet).await.unwrap();

    let backups = ctx.engine.list_backups().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].archives.len(), 2);
    let newest = backups[0].latest().unwrap().name.clone();

    let deleted = ctx.engine.prune_backups(&wallet, 1).unwrap();
    assert_eq!(deleted.len(), 1);
    let backups = ctx.engine.list_backups().unwrap();
    assert_eq!(backups[0].archives.len(), 1);
    assert_eq!(backups[0].latest().unwrap().name, newest);
}

// ============================================================================
// Restore Tests
// ============================================================================

/// Restoring on a device with no backups fails before touching the disk
#[tokio::test]
async fn test_restore_without_backups() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let wallet = DirectoryWallet::new(None, ctx.database_directory());

    let result = ctx
        .engine
        .restore_latest_backup(&wallet, &CancelToken::new())
        .await;
    assert!(matches!(result, Err(Error::NoBackupsFound)));
    assert!(!ctx.database_directory().exists());

    let logging = ctx.logging.clone().unwrap();
    let errors = logging.get_errors(10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].event, "restore_failed");
    assert_eq!(errors[0].error_details.as_deref(), Some("NoBackupsFound"));
}

/// Backup on one device, restore on another sharing the container
#[tokio::test]
async fn test_restore_on_second_device() {
    let container = TempDir::new().unwrap();
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let shared = serde_json::json!({"containerPath": container.path()});

    let content = wallet_content();
    let source_ctx = create_context_with(&first, shared.clone());
    let restore_ctx = create_context_with(&second, shared);

    let wallet = create_wallet(&source_ctx, &content);
    let archive = source_ctx.engine.create_backup(&wallet).await.unwrap();

    let restored = DirectoryWallet::new(None, restore_ctx.database_directory());
    let outcome = restore_ctx
        .engine
        .restore_latest_backup(&restored, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.wallet_folder, KEY);
    assert_eq!(outcome.archive, archive.name);
    assert_eq!(
        fs::read(restore_ctx.database_directory().join(DB_NAME)).unwrap(),
        content
    );
}

fn write_placeholder(folder: &Path, name: &str) {
    fs::create_dir_all(folder).unwrap();
    fs::write(folder.join(format!(".{}.icloud", name)), b"").unwrap();
}

/// An evicted archive is downloaded before it is extracted
#[tokio::test]
async fn test_restore_waits_for_placeholder() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    // Build the archive outside the container, then leave only a placeholder
    let staging = temp_dir.path().join("elsewhere");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join(DB_NAME), b"evicted wallet").unwrap();
    let name = "Tari-Aurora-Backup_2024-03-01_08-00-00.zip";
    let built = ArchiveCodec::default()
        .create_archive(&staging, &staging.join(name))
        .unwrap();

    let folder = temp_dir.path().join("container/Tari-Wallet-Backups").join(KEY);
    write_placeholder(&folder, name);

    // The provider materializes the file a little later, atomically
    let target = folder.join(name);
    let incoming = folder.join("incoming.part");
    let provider = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::copy(&built, &incoming).unwrap();
        fs::rename(&incoming, &target).unwrap();
    });

    let wallet = DirectoryWallet::new(None, ctx.database_directory());
    let outcome = ctx
        .engine
        .restore_latest_backup(&wallet, &CancelToken::new())
        .await
        .unwrap();
    provider.await.unwrap();

    assert_eq!(outcome.archive, name);
    assert_eq!(
        fs::read(ctx.database_directory().join(DB_NAME)).unwrap(),
        b"evicted wallet"
    );
}

/// Cancelling a restore that waits on a download leaves nothing behind
#[tokio::test]
async fn test_restore_cancelled_while_downloading() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let folder = temp_dir.path().join("container/Tari-Wallet-Backups").join(KEY);
    write_placeholder(&folder, "Tari-Aurora-Backup_2024-03-01_08-00-00.zip");

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let wallet = DirectoryWallet::new(None, ctx.database_directory());
    let result = ctx.engine.restore_latest_backup(&wallet, &cancel).await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(!ctx.database_directory().exists());
}
