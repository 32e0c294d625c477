//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "containerIdentifier": "iCloud.com.tari.wallet",
//!   "backupsRoot": "Tari-Wallet-Backups",
//!   "downloadTimeoutSecs": 300,
//!   "candidateOrder": "listing"
//! }
//! ```
//! Fields this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::DEFAULT_ARCHIVE_PREFIX;
use crate::ports::DownloadOptions;
use crate::services::archive::DEFAULT_DATABASE_SUFFIX;

pub const DEFAULT_CONTAINER_IDENTIFIER: &str = "iCloud.com.tari.wallet";
pub const DEFAULT_BACKUPS_ROOT: &str = "Tari-Wallet-Backups";

/// How restore picks a wallet folder when several exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateOrder {
    /// First folder with archives, in container listing order
    #[default]
    Listing,
    /// Folder holding the most recent archive
    Newest,
}

/// Backup engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub container_identifier: String,
    /// Root of the synchronized container for the local adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_path: Option<PathBuf>,
    pub backups_root: String,
    pub archive_prefix: String,
    pub database_suffix: String,
    pub reserved_entries: Vec<String>,
    pub download_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub watch_interval_ms: u64,
    pub candidate_order: CandidateOrder,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_identifier: DEFAULT_CONTAINER_IDENTIFIER.to_string(),
            container_path: None,
            backups_root: DEFAULT_BACKUPS_ROOT.to_string(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            database_suffix: DEFAULT_DATABASE_SUFFIX.to_string(),
            reserved_entries: vec!["Documents".to_string()],
            download_timeout_secs: 300,
            poll_interval_ms: 250,
            watch_interval_ms: 500,
            candidate_order: CandidateOrder::Listing,
            other: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing file yields defaults. The container path and download
    /// timeout can be overridden with `AURORA_BACKUP_CONTAINER` and
    /// `AURORA_BACKUP_DOWNLOAD_TIMEOUT_SECS`.
    pub fn load(dir: &Path) -> Result<Self> {
        let settings_path = dir.join("settings.json");

        let mut config: Config = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", settings_path.display(), e)))?
        } else {
            Config::default()
        };

        config.apply_env(
            std::env::var("AURORA_BACKUP_CONTAINER").ok(),
            std::env::var("AURORA_BACKUP_DOWNLOAD_TIMEOUT_SECS").ok(),
        )?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, container: Option<String>, timeout: Option<String>) -> Result<()> {
        if let Some(path) = container.filter(|p| !p.trim().is_empty()) {
            self.container_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = timeout {
            self.download_timeout_secs = secs.trim().parse().map_err(|_| {
                Error::Config(format!("AURORA_BACKUP_DOWNLOAD_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.backups_root.trim().is_empty() {
            return Err(Error::Config("backupsRoot must not be empty".to_string()));
        }
        if self.archive_prefix.trim().is_empty() {
            return Err(Error::Config("archivePrefix must not be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("pollIntervalMs must be positive".to_string()));
        }
        Ok(())
    }

    /// Save config to the data directory, keeping fields we don't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let settings_path = dir.join("settings.json");

        let mut value = serde_json::to_value(self)?;
        if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            if let Ok(serde_json::Value::Object(existing)) = serde_json::from_str(&content) {
                if let serde_json::Value::Object(ours) = &mut value {
                    for (key, v) in existing {
                        ours.entry(key).or_insert(v);
                    }
                }
            }
        }

        let content = serde_json::to_string_pretty(&value)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            timeout: Duration::from_secs(self.download_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}
