//! CLI command implementations

pub mod create;
pub mod list;
pub mod logs;
pub mod restore;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use aurora_backup_core::adapters::DirectoryWallet;
use aurora_backup_core::services::{BackupObserver, EntryPoint};
use aurora_backup_core::{BackupContext, SyncProgress, WalletIdentity};

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("AURORA_BACKUP_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".aurora-backup"))
        .context("Could not find home directory; set AURORA_BACKUP_DIR")
}

/// Get or create the backup context
pub fn get_context() -> Result<BackupContext> {
    let data_dir = get_data_dir()?;
    debug!(dir = %data_dir.display(), "using data directory");
    BackupContext::new(&data_dir, EntryPoint::Cli)
        .with_context(|| format!("Failed to initialize backup context in {}", data_dir.display()))
}

/// The local wallet, optionally identified by its public key
pub fn wallet(ctx: &BackupContext, public_key: Option<&str>) -> Result<DirectoryWallet> {
    let identity = public_key.map(WalletIdentity::parse).transpose()?;
    Ok(DirectoryWallet::new(identity, ctx.database_directory())
        .with_database_suffix(ctx.config.database_suffix.clone()))
}

/// Runtime for commands that drive the async engine
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Renders upload progress as a terminal progress bar
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new(archive: &str) -> Arc<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(format!("Uploading {}", archive));
        Arc::new(Self { bar })
    }
}

impl BackupObserver for ProgressBarObserver {
    fn on_backup_progress(&self, progress: &SyncProgress) {
        if let Some(error) = &progress.error {
            self.bar.abandon_with_message(format!("Upload failed: {}", error));
        } else if progress.completed {
            self.bar.set_position(100);
            self.bar.finish_with_message("Upload complete");
        } else {
            self.bar.set_position(progress.percent.round() as u64);
        }
    }
}
