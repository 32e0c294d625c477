//! Service layer - backup logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific part of the backup flow.

pub mod archive;
mod backup;
mod folders;
pub mod logging;
mod observers;
mod tracker;

pub use archive::ArchiveCodec;
pub use backup::BackupSyncEngine;
pub use folders::WalletFolderResolver;
pub use logging::{EntryPoint, LogEntry, LogEvent, LogFilter, LoggingService};
pub use observers::{BackupObserver, ObserverId, ObserverRegistry};
pub use tracker::BackupProgressTracker;
