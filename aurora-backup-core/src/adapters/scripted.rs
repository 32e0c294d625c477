//! Container with a test-driven change watch
//!
//! Filesystem operations go to a [`LocalSyncContainer`]; watches are handed
//! to the test, which pushes the provider's notifications itself.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::local::LocalSyncContainer;
use crate::domain::result::Result;
use crate::domain::{ChangeEvent, RemoteEntry, WatchPredicate};
use crate::ports::{RemoteContainerGateway, WatchHandle, WatchSink};

pub struct ScriptedContainer {
    inner: LocalSyncContainer,
    watches: Mutex<Vec<(WatchPredicate, WatchSink)>>,
}

impl ScriptedContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: LocalSyncContainer::new("iCloud.test.scripted", root),
            watches: Mutex::new(Vec::new()),
        }
    }

    /// Number of watches started so far
    pub fn watch_count(&self) -> usize {
        self.watches.lock().len()
    }

    /// Push an event to the most recent watch
    pub fn emit(&self, event: ChangeEvent) -> bool {
        match self.watches.lock().last() {
            Some((_, sink)) => sink.send(event),
            None => false,
        }
    }

    /// Whether the watch with the given index has been stopped
    pub fn is_stopped(&self, index: usize) -> bool {
        self.watches
            .lock()
            .get(index)
            .map(|(_, sink)| sink.is_stopped())
            .unwrap_or(true)
    }

    pub fn last_predicate(&self) -> Option<WatchPredicate> {
        self.watches.lock().last().map(|(p, _)| p.clone())
    }
}

#[async_trait]
impl RemoteContainerGateway for ScriptedContainer {
    fn container_identifier(&self) -> &str {
        self.inner.container_identifier()
    }

    fn resolve_container_root(&self) -> Result<PathBuf> {
        self.inner.resolve_container_root()
    }

    fn ensure_directory(&self, path: &Path) -> Result<()> {
        self.inner.ensure_directory(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<RemoteEntry>> {
        self.inner.list_entries(path)
    }

    fn copy_into(&self, local: &Path, remote: &Path) -> Result<()> {
        self.inner.copy_into(local, remote)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.inner.remove(path)
    }

    fn begin_watching_changes(&self, predicate: WatchPredicate) -> Result<WatchHandle> {
        let (sink, handle) = WatchHandle::channel();
        self.watches.lock().push((predicate, sink));
        Ok(handle)
    }

    fn start_downloading(&self, entry: &RemoteEntry) -> Result<()> {
        self.inner.start_downloading(entry)
    }

    fn is_materialized(&self, path: &Path) -> bool {
        self.inner.is_materialized(path)
    }
}
