//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod backup;
pub mod progress;
pub mod remote;
pub mod result;
mod wallet;

pub use backup::{
    archive_name, parse_archive_time, BackupArchive, RestoreOutcome, WalletBackups,
    ARCHIVE_TIME_FORMAT, DEFAULT_ARCHIVE_PREFIX,
};
pub use progress::{SyncProgress, SyncState};
pub use remote::{ChangeEvent, RemoteEntry, TrackedItem, WatchPredicate};
pub use wallet::WalletIdentity;
