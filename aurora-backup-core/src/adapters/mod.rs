//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Local directory as the synchronized storage container
//! - Directory-backed wallet for hosts that only know the wallet's location

pub mod local;
pub mod wallet;

#[cfg(test)]
pub mod scripted;

pub use local::LocalSyncContainer;
pub use wallet::DirectoryWallet;
