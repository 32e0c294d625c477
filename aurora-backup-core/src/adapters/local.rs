//! Filesystem-backed synchronized container
//!
//! Treats a local directory as the synchronized storage container, the way a
//! desktop sync client exposes one. Files present under the root count as
//! uploaded. Entries named `.{name}.icloud` are placeholders whose content is
//! materialized by the provider outside this process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::remote::{is_placeholder_name, materialized_name};
use crate::domain::result::{Error, Result};
use crate::domain::{ChangeEvent, RemoteEntry, TrackedItem, WatchPredicate};
use crate::ports::{RemoteContainerGateway, WatchHandle, WatchSink};

/// Container rooted at a local directory
pub struct LocalSyncContainer {
    identifier: String,
    root: Option<PathBuf>,
    watch_interval: Duration,
}

impl LocalSyncContainer {
    pub fn new(identifier: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            root: Some(root.into()),
            watch_interval: Duration::from_millis(500),
        }
    }

    /// A container whose provider is signed out or disabled
    pub fn unavailable(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            root: None,
            watch_interval: Duration::from_millis(500),
        }
    }

    /// How often a watch rescans the container
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }
}

fn modified_time(metadata: &fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Collect sync state for every file under `root` matching `predicate`
fn scan(root: &Path, predicate: &WatchPredicate) -> Vec<TrackedItem> {
    let mut items = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_placeholder_name(&name) {
                // Evicted content is already in the cloud
                let real = materialized_name(&name);
                if predicate.matches(&real) {
                    items.push(TrackedItem {
                        path: dir.join(&real),
                        name: real,
                        ..Default::default()
                    }
                    .uploaded(true, false));
                }
                continue;
            }
            if predicate.matches(&name) {
                items.push(TrackedItem {
                    name,
                    path,
                    ..Default::default()
                }
                .uploaded(true, false)
                .percent(100.0));
            }
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    items
}

async fn run_watch(root: PathBuf, predicate: WatchPredicate, interval: Duration, sink: WatchSink) {
    let mut last = scan(&root, &predicate);
    if !sink.send(ChangeEvent::Started(last.clone())) {
        return;
    }

    loop {
        tokio::select! {
            _ = sink.stopped() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let items = scan(&root, &predicate);
        if items != last {
            if !sink.send(ChangeEvent::Updated(items.clone())) {
                break;
            }
            last = items;
        }
    }
    debug!(root = %root.display(), "change watch stopped");
}

#[async_trait]
impl RemoteContainerGateway for LocalSyncContainer {
    fn container_identifier(&self) -> &str {
        &self.identifier
    }

    fn resolve_container_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) if root.is_dir() => Ok(root.clone()),
            _ => Err(Error::ContainerNotFound),
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            entries.push(RemoteEntry::from_listing(
                entry.path(),
                metadata.is_dir(),
                modified_time(&metadata),
            ));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn copy_into(&self, local: &Path, remote: &Path) -> Result<()> {
        if remote.exists() {
            fs::remove_file(remote)?;
        }
        fs::copy(local, remote)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn begin_watching_changes(&self, predicate: WatchPredicate) -> Result<WatchHandle> {
        let root = self.resolve_container_root()?;
        let (sink, handle) = WatchHandle::channel();
        tokio::spawn(run_watch(root, predicate, self.watch_interval, sink));
        Ok(handle)
    }

    fn start_downloading(&self, entry: &RemoteEntry) -> Result<()> {
        if !entry.path.exists() && !self.is_materialized(&entry.materialized_path()) {
            warn!(entry = %entry.name, "placeholder vanished before download was requested");
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", entry.path.display()),
            )));
        }
        debug!(entry = %entry.name, "requested materialization");
        Ok(())
    }

    fn is_materialized(&self, path: &Path) -> bool {
        path.is_file()
    }
}
