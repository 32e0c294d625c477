//! Remote container port - synchronized storage abstraction

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::domain::result::{Error, Result};
use crate::domain::{ChangeEvent, RemoteEntry, WatchPredicate};

/// Bounds for waiting on a placeholder to materialize
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Live subscription to change notifications
///
/// Events arrive until the handle is stopped or dropped.
pub struct WatchHandle {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    cancel: CancelToken,
}

/// Producer side of a [`WatchHandle`]
#[derive(Clone)]
pub struct WatchSink {
    events: mpsc::UnboundedSender<ChangeEvent>,
    cancel: CancelToken,
}

impl WatchHandle {
    /// Create a connected sink/handle pair
    pub fn channel() -> (WatchSink, WatchHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        (
            WatchSink {
                events: tx,
                cancel: cancel.clone(),
            },
            WatchHandle { events: rx, cancel },
        )
    }

    /// Next event, or `None` once the producer is gone or the watch stopped
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            event = self.events.recv() => event,
            _ = self.cancel.cancelled() => None,
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn stop_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl WatchSink {
    /// Deliver an event; false once the watch is no longer alive
    pub fn send(&self, event: ChangeEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.events.send(event).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.events.is_closed()
    }

    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }
}

/// Synchronized storage container
///
/// Paths are absolute paths inside the container root returned by
/// [`RemoteContainerGateway::resolve_container_root`].
#[async_trait]
pub trait RemoteContainerGateway: Send + Sync {
    /// Namespaced identifier of the container
    fn container_identifier(&self) -> &str;

    /// Root of the container; `ContainerNotFound` when the provider is unavailable
    fn resolve_container_root(&self) -> Result<PathBuf>;

    /// Create a directory (and parents) if missing
    fn ensure_directory(&self, path: &Path) -> Result<()>;

    /// Whether anything exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// List the direct children of `path`
    fn list_entries(&self, path: &Path) -> Result<Vec<RemoteEntry>>;

    /// Copy a local file into the container, replacing any existing file
    fn copy_into(&self, local: &Path, remote: &Path) -> Result<()>;

    /// Remove a file from the container
    fn remove(&self, path: &Path) -> Result<()>;

    /// Start watching entries matching `predicate`
    fn begin_watching_changes(&self, predicate: WatchPredicate) -> Result<WatchHandle>;

    /// Ask the provider to materialize a placeholder entry
    fn start_downloading(&self, entry: &RemoteEntry) -> Result<()>;

    /// Whether the content at `path` is present on disk
    fn is_materialized(&self, path: &Path) -> bool;

    /// Make an entry available locally and return its local path
    ///
    /// Placeholders are requested from the provider, then polled until the
    /// materialized file exists, the timeout elapses or `cancel` fires.
    async fn download(
        &self,
        entry: &RemoteEntry,
        options: DownloadOptions,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        if !entry.is_placeholder {
            return Ok(entry.path.clone());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let target = entry.materialized_path();
        self.start_downloading(entry)?;
        debug!(entry = %entry.name, "waiting for placeholder to materialize");

        let wait = async {
            loop {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                if self.is_materialized(&target) {
                    return Ok(target.clone());
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(options.poll_interval) => {}
                }
            }
        };

        match tokio::time::timeout(options.timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(Error::DownloadTimedOut(options.timeout)),
        }
    }
}
