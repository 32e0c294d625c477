//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The backup core
//! depends only on these traits, not on concrete implementations.

mod container;
mod wallet;

pub use container::{DownloadOptions, RemoteContainerGateway, WatchHandle, WatchSink};
pub use wallet::WalletEngine;
