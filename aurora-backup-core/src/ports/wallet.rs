//! Wallet engine port

use std::path::{Path, PathBuf};

use crate::domain::result::Result;
use crate::domain::WalletIdentity;

/// The wallet engine as seen by the backup core
///
/// Key material and database handling stay with the wallet; the backup core
/// only reads the public identity and the database location.
pub trait WalletEngine: Send + Sync {
    /// Public identity of the current wallet, if one exists
    fn public_identity(&self) -> Option<WalletIdentity>;

    /// Directory holding the wallet database
    fn database_directory(&self) -> PathBuf;

    /// Called once a backup has been extracted into `database_directory`
    ///
    /// An error here rolls the restore back.
    fn complete_restore(&self, database_directory: &Path) -> Result<()>;
}
