//! Backup sync engine - create, upload and restore wallet backups
//!
//! A backup is a ZIP of the wallet database staged in a local scratch
//! directory, then copied into `{container}/{backupsRoot}/{walletFolder}`.
//! The copy returns immediately; the storage provider uploads in the
//! background and progress reaches observers through a change watch.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::archive::ArchiveCodec;
use super::folders::WalletFolderResolver;
use super::logging::{LogEvent, LoggingService};
use super::observers::{BackupObserver, ObserverId, ObserverRegistry};
use super::tracker::BackupProgressTracker;
use crate::cancel::CancelToken;
use crate::config::{CandidateOrder, Config};
use crate::domain::result::{Error, Result};
use crate::domain::{
    archive_name, BackupArchive, RemoteEntry, RestoreOutcome, SyncProgress, SyncState,
    WalletBackups, WalletIdentity, WatchPredicate,
};
use crate::ports::{DownloadOptions, RemoteContainerGateway, WalletEngine};

/// Exclusive claim on the scratch directory for one `create_backup` call
struct ScratchLock {
    file: File,
}

impl ScratchLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        FileExt::try_lock_exclusive(&file).map_err(|_| Error::BackupInProgress)?;
        Ok(Self { file })
    }
}

impl Drop for ScratchLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn record(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(logger) = logger {
        if let Err(e) = logger.log(event) {
            warn!(error = %e, "failed to record backup event");
        }
    }
}

/// Orchestrates backups of one wallet app against one storage container
pub struct BackupSyncEngine {
    gateway: Arc<dyn RemoteContainerGateway>,
    resolver: WalletFolderResolver,
    codec: ArchiveCodec,
    observers: Arc<ObserverRegistry>,
    tracker: Arc<BackupProgressTracker>,
    scratch_dir: PathBuf,
    download_options: DownloadOptions,
    candidate_order: CandidateOrder,
    logger: Option<Arc<LoggingService>>,
    watch: Mutex<Option<CancelToken>>,
}

impl BackupSyncEngine {
    /// `scratch_dir` stages archives before they are copied into the container
    pub fn new(
        config: &Config,
        gateway: Arc<dyn RemoteContainerGateway>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        let observers = Arc::new(ObserverRegistry::new());
        Self {
            gateway,
            resolver: WalletFolderResolver::new(
                config.backups_root.clone(),
                config.archive_prefix.clone(),
                config.reserved_entries.clone(),
            ),
            codec: ArchiveCodec::new(config.database_suffix.clone()),
            tracker: Arc::new(BackupProgressTracker::new(Arc::clone(&observers))),
            observers,
            scratch_dir: scratch_dir.into(),
            download_options: config.download_options(),
            candidate_order: config.candidate_order,
            logger: None,
            watch: Mutex::new(None),
        }
    }

    /// Record backup events in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn resolver(&self) -> &WalletFolderResolver {
        &self.resolver
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn lock_path(&self) -> PathBuf {
        self.scratch_dir.with_extension("lock")
    }

    /// Whether the container holds a folder for this wallet
    ///
    /// Any resolution failure counts as no backup.
    pub fn is_backup_present(&self, wallet: &dyn WalletEngine) -> bool {
        let Some(identity) = wallet.public_identity() else {
            return false;
        };
        let folder = self.resolver.remote_folder_name(&identity);
        match self.resolver.list_wallet_folders(self.gateway.as_ref()) {
            Ok(folders) => folders.iter().any(|f| *f == folder),
            Err(e) => {
                debug!(error = %e, "backup presence check failed");
                false
            }
        }
    }

    /// Archive the wallet database and copy it into the wallet's remote folder
    ///
    /// Returns once the archive is in the container. Upload progress,
    /// completion and failure are delivered to observers. Concurrent calls
    /// are not supported; an overlapping call fails with `BackupInProgress`.
    pub async fn create_backup(&self, wallet: &dyn WalletEngine) -> Result<BackupArchive> {
        let identity = wallet.public_identity().ok_or(Error::IdentityUnavailable)?;
        let folder_name = self.resolver.remote_folder_name(&identity);
        let _lock = ScratchLock::acquire(&self.lock_path())?;

        let created_at = Utc::now();
        let name = archive_name(self.resolver.archive_prefix(), created_at);

        // A finishing upload from the previous backup must not clean up this one
        self.stop_watching();
        let generation = self.tracker.reset(name.clone(), Some(self.scratch_dir.clone()));

        let result = self
            .stage_and_copy(wallet, &identity, &name, created_at, generation)
            .await;
        match &result {
            Ok(archive) => {
                info!(folder = %folder_name, archive = %archive.name, "backup copied to container");
                record(
                    &self.logger,
                    LogEvent::new("backup_created")
                        .with_wallet_folder(&folder_name)
                        .with_archive(&archive.name),
                );
            }
            Err(e) => {
                warn!(folder = %folder_name, error = %e, "backup failed");
                record(
                    &self.logger,
                    LogEvent::new("backup_failed")
                        .with_wallet_folder(&folder_name)
                        .with_archive(&name)
                        .with_error(e.to_string()),
                );
            }
        }
        result
    }

    async fn stage_and_copy(
        &self,
        wallet: &dyn WalletEngine,
        identity: &WalletIdentity,
        name: &str,
        created_at: chrono::DateTime<Utc>,
        generation: u64,
    ) -> Result<BackupArchive> {
        let source = wallet.database_directory();
        let staged = self.scratch_dir.join(name);
        let codec = self.codec.clone();
        let (path, size_bytes, sha256) = tokio::task::spawn_blocking(move || {
            let path = codec.create_archive(&source, &staged)?;
            let size = fs::metadata(&path).map_err(Error::archive)?.len();
            let digest = ArchiveCodec::digest(&path).map_err(Error::archive)?;
            Ok::<_, Error>((path, size, digest))
        })
        .await
        .map_err(Error::archive)??;

        let remote_folder = self.resolver.wallet_folder(self.gateway.as_ref(), identity)?;
        self.gateway
            .ensure_directory(&remote_folder)
            .map_err(|e| Error::UnableToCreateBackupFolder(e.to_string()))?;
        self.gateway.copy_into(&path, &remote_folder.join(name))?;

        let folder_name = self.resolver.remote_folder_name(identity);
        self.start_watch(generation, &folder_name, name)?;

        Ok(BackupArchive {
            name: name.to_string(),
            path,
            created_at,
            size_bytes,
            sha256,
        })
    }

    /// Feed change notifications for `.zip` entries to the tracker
    fn start_watch(&self, generation: u64, folder: &str, archive: &str) -> Result<()> {
        let mut handle = self
            .gateway
            .begin_watching_changes(WatchPredicate::Extension("zip".to_string()))?;
        let stop = handle.stop_token();

        let tracker = Arc::clone(&self.tracker);
        let logger = self.logger.clone();
        let folder = folder.to_string();
        let archive = archive.to_string();
        tokio::spawn(async move {
            while let Some(event) = handle.next_event().await {
                for progress in tracker.handle_event_for(generation, &event) {
                    if progress.completed {
                        info!(archive = %archive, "backup upload completed");
                        record(
                            &logger,
                            LogEvent::new("upload_completed")
                                .with_wallet_folder(&folder)
                                .with_archive(&archive),
                        );
                    } else if let Some(error) = &progress.error {
                        warn!(archive = %archive, error = %error, "backup upload failed");
                        record(
                            &logger,
                            LogEvent::new("upload_failed")
                                .with_wallet_folder(&folder)
                                .with_archive(&archive)
                                .with_error(error.to_string()),
                        );
                    }
                }
            }
            debug!(archive = %archive, "watch task finished");
        });

        if let Some(previous) = self.watch.lock().replace(stop) {
            previous.cancel();
        }
        Ok(())
    }

    /// Stop delivering upload progress for the current backup
    pub fn stop_watching(&self) {
        if let Some(stop) = self.watch.lock().take() {
            stop.cancel();
        }
    }

    /// Restore the newest backup into the wallet's database directory
    ///
    /// Nothing is written locally before a candidate archive is found. If
    /// extraction or the wallet's completion step fails, the database
    /// directory is removed again, or emptied if it existed beforehand.
    pub async fn restore_latest_backup(
        &self,
        wallet: &dyn WalletEngine,
        cancel: &CancelToken,
    ) -> Result<RestoreOutcome> {
        self.stop_watching();
        self.tracker.clear();

        let result = self.restore_inner(wallet, cancel).await;
        match &result {
            Ok(outcome) => {
                info!(folder = %outcome.wallet_folder, archive = %outcome.archive, "wallet restored");
                record(
                    &self.logger,
                    LogEvent::new("restore_completed")
                        .with_wallet_folder(&outcome.wallet_folder)
                        .with_archive(&outcome.archive),
                );
            }
            Err(e) => {
                warn!(error = %e, "restore failed");
                if let Some(logger) = &self.logger {
                    let details = format!("{:?}", e);
                    if let Err(log_err) =
                        logger.log_error("restore_failed", &e.to_string(), Some(&details))
                    {
                        warn!(error = %log_err, "failed to record backup event");
                    }
                }
            }
        }
        result
    }

    async fn restore_inner(
        &self,
        wallet: &dyn WalletEngine,
        cancel: &CancelToken,
    ) -> Result<RestoreOutcome> {
        let db_dir = wallet.database_directory();
        if has_entries(&db_dir) {
            return Err(Error::WalletAlreadyExists(db_dir));
        }
        let existed = db_dir.is_dir();

        let (folder, entry) = self.choose_candidate()?;
        debug!(folder = %folder, archive = %entry.name, "restoring from candidate");

        let local = self
            .gateway
            .download(&entry, self.download_options, cancel)
            .await?;

        let codec = self.codec.clone();
        let target = db_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || codec.extract_archive(&local, &target))
            .await
            .map_err(Error::unzip)
            .and_then(|r| r);
        if let Err(e) = extracted {
            remove_partial(&db_dir, existed);
            return Err(e);
        }

        if let Err(e) = wallet.complete_restore(&db_dir) {
            remove_partial(&db_dir, existed);
            return Err(match e {
                Error::IdentityDerivationFailed(msg) => Error::IdentityDerivationFailed(msg),
                other => Error::IdentityDerivationFailed(other.to_string()),
            });
        }

        Ok(RestoreOutcome {
            wallet_folder: folder,
            archive: entry.materialized_name(),
            database_directory: db_dir,
        })
    }

    /// Pick the wallet folder and archive a restore should use
    fn choose_candidate(&self) -> Result<(String, RemoteEntry)> {
        let gateway = self.gateway.as_ref();
        let folders = self.resolver.list_wallet_folders(gateway)?;

        let mut candidates = Vec::new();
        for folder in folders {
            let Some(latest) = self.resolver.list_archives(gateway, &folder)?.pop() else {
                continue;
            };
            if self.candidate_order == CandidateOrder::Listing {
                return Ok((folder, latest));
            }
            candidates.push((folder, latest));
        }

        candidates
            .into_iter()
            .max_by(|(_, a), (_, b)| self.resolver.archive_time(a).cmp(&self.resolver.archive_time(b)))
            .ok_or(Error::NoBackupsFound)
    }

    /// Every wallet folder with its archives, oldest archive first
    pub fn list_backups(&self) -> Result<Vec<WalletBackups>> {
        let gateway = self.gateway.as_ref();
        let folders = match self.resolver.list_wallet_folders(gateway) {
            Ok(folders) => folders,
            Err(Error::NoBackupsFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        folders
            .into_iter()
            .map(|folder| {
                let archives = self.resolver.list_archives(gateway, &folder)?;
                Ok(WalletBackups { folder, archives })
            })
            .collect()
    }

    /// Delete all but the newest `keep` archives of a wallet's folder
    ///
    /// The newest archive is always kept. Returns the deleted names.
    pub fn prune_backups(&self, wallet: &dyn WalletEngine, keep: usize) -> Result<Vec<String>> {
        let identity = wallet.public_identity().ok_or(Error::IdentityUnavailable)?;
        let folder = self.resolver.remote_folder_name(&identity);
        let mut archives = self.resolver.list_archives(self.gateway.as_ref(), &folder)?;

        let keep = keep.max(1);
        let mut deleted = Vec::new();
        while archives.len() > keep {
            let oldest = archives.remove(0);
            self.gateway.remove(&oldest.path)?;
            debug!(archive = %oldest.name, "pruned backup");
            deleted.push(oldest.materialized_name());
        }

        if !deleted.is_empty() {
            record(
                &self.logger,
                LogEvent::new("backups_pruned")
                    .with_wallet_folder(&folder)
                    .with_error_details(format!("deleted {}", deleted.len())),
            );
        }
        Ok(deleted)
    }

    /// Register an observer without taking ownership of it
    pub fn add_observer<O: BackupObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        self.observers.add(observer)
    }

    /// Same as [`Self::add_observer`] for an observer behind `dyn BackupObserver`
    pub fn add_observer_dyn(&self, observer: &Arc<dyn BackupObserver>) -> ObserverId {
        self.observers.add_weak(Arc::downgrade(observer))
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Last progress delivered for the current operation
    pub fn progress(&self) -> SyncProgress {
        self.tracker.progress()
    }

    pub fn state(&self) -> SyncState {
        self.tracker.state()
    }

    pub fn in_progress(&self) -> bool {
        self.tracker.in_progress()
    }
}

impl Drop for BackupSyncEngine {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Undo a failed restore; a directory the wallet already had is only emptied
fn remove_partial(dir: &Path, existed: bool) {
    let result = if existed {
        clear_directory(dir)
    } else {
        fs::remove_dir_all(dir)
    };
    if let Err(e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), error = %e, "could not remove partial restore");
        }
    }
}

fn clear_directory(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
