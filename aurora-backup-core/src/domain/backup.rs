//! Backup domain model

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::remote::RemoteEntry;

/// Default prefix of archive file names
pub const DEFAULT_ARCHIVE_PREFIX: &str = "Tari-Aurora-Backup";

/// Timestamp format embedded in archive names (UTC, second precision)
pub const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Metadata for a staged backup archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArchive {
    /// Archive filename (e.g., "Tari-Aurora-Backup_2025-01-15_10-30-00.zip")
    pub name: String,
    /// Local staging path
    pub path: PathBuf,
    /// When the archive was created
    pub created_at: DateTime<Utc>,
    /// File size in bytes
    pub size_bytes: u64,
    /// SHA-256 of the archive, hex encoded
    pub sha256: String,
}

impl BackupArchive {
    /// Format size for human display
    pub fn size_display(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.1} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.1} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.1} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}

/// Build the archive name for a backup taken at `now`
pub fn archive_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.zip", prefix, now.format(ARCHIVE_TIME_FORMAT))
}

/// Recover the creation time from an archive name
pub fn parse_archive_time(prefix: &str, name: &str) -> Option<DateTime<Utc>> {
    let ts = name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".zip")?;
    NaiveDateTime::parse_from_str(ts, ARCHIVE_TIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Archives stored under one remote wallet folder
#[derive(Debug, Clone, Serialize)]
pub struct WalletBackups {
    pub folder: String,
    /// Oldest first
    pub archives: Vec<RemoteEntry>,
}

impl WalletBackups {
    pub fn latest(&self) -> Option<&RemoteEntry> {
        self.archives.last()
    }
}

/// Outcome of a successful restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub wallet_folder: String,
    pub archive: String,
    pub database_directory: PathBuf,
}
