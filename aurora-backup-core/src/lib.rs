//! Aurora Backup Core - cloud backup sync for the Aurora wallet
//!
//! This crate implements the backup engine following hexagonal architecture:
//!
//! - **domain**: Core entities (WalletIdentity, RemoteEntry, SyncProgress, etc.)
//! - **ports**: Trait definitions for external dependencies (RemoteContainerGateway, WalletEngine)
//! - **services**: Backup orchestration (BackupSyncEngine and its collaborators)
//! - **adapters**: Concrete implementations (local synchronized container, directory wallet)

pub mod adapters;
pub mod cancel;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use adapters::LocalSyncContainer;
use config::Config;
use services::{BackupSyncEngine, EntryPoint, LoggingService};

// Re-export commonly used types at crate root
pub use cancel::CancelToken;
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{BackupArchive, RestoreOutcome, SyncProgress, SyncState, WalletBackups, WalletIdentity};

/// Main context for backup operations
///
/// Lays out the data directory and wires the engine to a local synchronized
/// container:
/// - `settings.json` and `backup_logs.duckdb`
/// - `Documents/wallet` holds the wallet database
/// - `Documents/Backups` stages archives
/// - `container/` is the synchronized container unless configured otherwise
pub struct BackupContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub logging: Option<Arc<LoggingService>>,
    pub engine: BackupSyncEngine,
}

impl BackupContext {
    /// Create a backup context for `data_dir`
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let container_root = match &config.container_path {
            Some(path) => path.clone(),
            None => {
                let path = data_dir.join("container");
                std::fs::create_dir_all(&path)?;
                path
            }
        };
        let container = LocalSyncContainer::new(config.container_identifier.clone(), container_root)
            .with_watch_interval(config.watch_interval());

        // The event log is diagnostic; backups work without it
        let logging = match LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION")) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                warn!(error = %e, "event log unavailable");
                None
            }
        };

        let mut engine =
            BackupSyncEngine::new(&config, Arc::new(container), Self::scratch_dir_in(data_dir));
        if let Some(logger) = &logging {
            engine = engine.with_logger(Arc::clone(logger));
        }

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            logging,
            engine,
        })
    }

    fn scratch_dir_in(data_dir: &Path) -> PathBuf {
        data_dir.join("Documents").join("Backups")
    }

    /// Where the wallet database lives
    pub fn database_directory(&self) -> PathBuf {
        self.data_dir.join("Documents").join("wallet")
    }
}
