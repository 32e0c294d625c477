//! Wallet folder resolution inside the backups root

use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::result::{Error, Result};
use crate::domain::{parse_archive_time, RemoteEntry, WalletIdentity};
use crate::ports::RemoteContainerGateway;

/// Maps wallets to remote folders and enumerates what is stored there
#[derive(Debug, Clone)]
pub struct WalletFolderResolver {
    backups_root: String,
    archive_prefix: String,
    reserved: Vec<String>,
}

impl WalletFolderResolver {
    pub fn new(
        backups_root: impl Into<String>,
        archive_prefix: impl Into<String>,
        reserved: Vec<String>,
    ) -> Self {
        Self {
            backups_root: backups_root.into(),
            archive_prefix: archive_prefix.into(),
            reserved,
        }
    }

    /// Remote folder of a wallet: its hex public identity
    pub fn remote_folder_name(&self, identity: &WalletIdentity) -> String {
        identity.as_hex().to_string()
    }

    /// `{container}/{backups_root}`
    pub fn backups_root(&self, gateway: &dyn RemoteContainerGateway) -> Result<PathBuf> {
        Ok(gateway.resolve_container_root()?.join(&self.backups_root))
    }

    pub fn wallet_folder(
        &self,
        gateway: &dyn RemoteContainerGateway,
        identity: &WalletIdentity,
    ) -> Result<PathBuf> {
        Ok(self.backups_root(gateway)?.join(self.remote_folder_name(identity)))
    }

    /// Wallet folders under the backups root, in the container's listing order
    ///
    /// Reserved entries (such as the provider's `Documents` folder) and hidden
    /// entries are skipped. Fails with `NoBackupsFound` when nothing is left.
    pub fn list_wallet_folders(&self, gateway: &dyn RemoteContainerGateway) -> Result<Vec<String>> {
        let root = self.backups_root(gateway)?;
        if !gateway.exists(&root) {
            return Err(Error::NoBackupsFound);
        }

        let entries = match gateway.list_entries(&root) {
            Ok(entries) => entries,
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NoBackupsFound)
            }
            Err(e) => return Err(e),
        };

        let folders: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_directory)
            .filter(|e| !e.name.starts_with('.'))
            .filter(|e| !self.reserved.iter().any(|r| r == &e.name))
            .map(|e| e.name)
            .collect();

        if folders.is_empty() {
            return Err(Error::NoBackupsFound);
        }
        Ok(folders)
    }

    /// Backup archives in a wallet folder, oldest first
    pub fn list_archives(
        &self,
        gateway: &dyn RemoteContainerGateway,
        folder: &str,
    ) -> Result<Vec<RemoteEntry>> {
        let path = self.backups_root(gateway)?.join(folder);
        if !gateway.exists(&path) {
            return Ok(Vec::new());
        }

        let mut archives: Vec<RemoteEntry> = gateway
            .list_entries(&path)?
            .into_iter()
            .filter(|e| !e.is_directory)
            .filter(|e| {
                let name = e.materialized_name();
                name.starts_with(&self.archive_prefix) && name.ends_with(".zip")
            })
            .collect();

        archives.sort_by(|a, b| self.compare_age(a, b));
        Ok(archives)
    }

    /// When an archive was taken: the timestamp in its name, else its mtime
    pub fn archive_time(&self, entry: &RemoteEntry) -> Option<DateTime<Utc>> {
        parse_archive_time(&self.archive_prefix, &entry.materialized_name()).or(entry.modified)
    }

    fn compare_age(&self, a: &RemoteEntry, b: &RemoteEntry) -> Ordering {
        self.archive_time(a)
            .cmp(&self.archive_time(b))
            .then_with(|| a.materialized_name().cmp(&b.materialized_name()))
    }

    pub fn archive_prefix(&self) -> &str {
        &self.archive_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalSyncContainer;
    use crate::domain::remote::placeholder_name;
    use std::fs;
    use tempfile::tempdir;

    fn resolver() -> WalletFolderResolver {
        WalletFolderResolver::new(
            "Tari-Wallet-Backups",
            "Tari-Aurora-Backup",
            vec!["Documents".to_string()],
        )
    }

    #[test]
    fn test_missing_root_means_no_backups() {
        let dir = tempdir().unwrap();
        let container = LocalSyncContainer::new("iCloud.test", dir.path());
        assert!(matches!(
            resolver().list_wallet_folders(&container),
            Err(Error::NoBackupsFound)
        ));
    }

    #[test]
    fn test_reserved_entries_are_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Tari-Wallet-Backups");
        fs::create_dir_all(root.join("Documents")).unwrap();
        let container = LocalSyncContainer::new("iCloud.test", dir.path());
        assert!(matches!(
            resolver().list_wallet_folders(&container),
            Err(Error::NoBackupsFound)
        ));

        fs::create_dir_all(root.join("abcd")).unwrap();
        fs::write(root.join("stray.zip"), b"x").unwrap();
        assert_eq!(resolver().list_wallet_folders(&container).unwrap(), vec!["abcd"]);
    }

    #[test]
    fn test_unavailable_container_passes_through() {
        let container = LocalSyncContainer::unavailable("iCloud.test");
        assert!(matches!(
            resolver().list_wallet_folders(&container),
            Err(Error::ContainerNotFound)
        ));
    }

    #[test]
    fn test_archives_sorted_by_name_timestamp() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("Tari-Wallet-Backups/abcd");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("Tari-Aurora-Backup_2021-01-01_00-00-00.zip"), b"x").unwrap();
        fs::write(
            folder.join(placeholder_name("Tari-Aurora-Backup_2022-01-01_00-00-00.zip")),
            b"",
        )
        .unwrap();
        fs::write(folder.join("Tari-Aurora-Backup_2020-01-01_00-00-00.zip"), b"x").unwrap();
        fs::write(folder.join("unrelated.zip"), b"x").unwrap();

        let container = LocalSyncContainer::new("iCloud.test", dir.path());
        let archives = resolver().list_archives(&container, "abcd").unwrap();
        let names: Vec<String> = archives.iter().map(|a| a.materialized_name()).collect();
        assert_eq!(
            names,
            vec![
                "Tari-Aurora-Backup_2020-01-01_00-00-00.zip",
                "Tari-Aurora-Backup_2021-01-01_00-00-00.zip",
                "Tari-Aurora-Backup_2022-01-01_00-00-00.zip",
            ]
        );
        assert!(archives[2].is_placeholder);
    }
}
