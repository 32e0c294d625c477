//! Wallet engine backed by a known identity and data directory
//!
//! Used by the CLI, where the wallet itself lives in another process and only
//! its public key and database location are known.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::WalletIdentity;
use crate::ports::WalletEngine;

pub struct DirectoryWallet {
    identity: Option<WalletIdentity>,
    database_directory: PathBuf,
    database_suffix: String,
}

impl DirectoryWallet {
    pub fn new(identity: Option<WalletIdentity>, database_directory: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            database_directory: database_directory.into(),
            database_suffix: ".sqlite3".to_string(),
        }
    }

    pub fn with_database_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.database_suffix = suffix.into();
        self
    }
}

impl WalletEngine for DirectoryWallet {
    fn public_identity(&self) -> Option<WalletIdentity> {
        self.identity.clone()
    }

    fn database_directory(&self) -> PathBuf {
        self.database_directory.clone()
    }

    fn complete_restore(&self, database_directory: &Path) -> Result<()> {
        let has_database = fs::read_dir(database_directory)?
            .flatten()
            .any(|e| e.file_name().to_string_lossy().ends_with(&self.database_suffix));
        if !has_database {
            return Err(Error::IdentityDerivationFailed(
                "restored backup contains no wallet database".to_string(),
            ));
        }
        info!(dir = %database_directory.display(), "wallet database restored");
        Ok(())
    }
}
