//! Upload progress tracking
//!
//! Turns change-watch notifications into normalized [`SyncProgress`] values
//! and fans them out through the [`ObserverRegistry`].
//!
//! Per operation: `Idle -> Gathering -> InProgress(p) -> Completed | Failed`.
//! Terminal states are not sticky; the next `Started` event gathers again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::observers::ObserverRegistry;
use crate::domain::result::Error;
use crate::domain::{ChangeEvent, SyncProgress, SyncState, TrackedItem};

pub struct BackupProgressTracker {
    inner: Mutex<TrackerInner>,
    observers: Arc<ObserverRegistry>,
}

struct TrackerInner {
    /// Bumped on every reset so events from a stale watch are dropped
    generation: u64,
    target: Option<String>,
    scratch_dir: Option<PathBuf>,
    state: SyncState,
    last: SyncProgress,
    percent: f64,
    in_progress: bool,
}

enum Outcome {
    Completed,
    Failed(String),
    Progress(f64),
}

impl TrackerInner {
    fn tracked<'a>(&self, items: &'a [TrackedItem]) -> Option<&'a TrackedItem> {
        let target = self.target.as_deref()?;
        items.iter().filter(|item| item.name.contains(target)).last()
    }

    fn evaluate(&self, items: &[TrackedItem]) -> Option<Outcome> {
        let item = self.tracked(items)?;
        if item.is_uploaded == Some(true) && item.is_uploading == Some(false) {
            Some(Outcome::Completed)
        } else if let Some(error) = &item.upload_error {
            Some(Outcome::Failed(error.clone()))
        } else {
            item.percent_uploaded.map(Outcome::Progress)
        }
    }
}

impl BackupProgressTracker {
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                generation: 0,
                target: None,
                scratch_dir: None,
                state: SyncState::Idle,
                last: SyncProgress::default(),
                percent: 0.0,
                in_progress: false,
            }),
            observers,
        }
    }

    /// Start a new operation tracking entries named like `target`
    ///
    /// `scratch_dir` is removed once the upload completes. Returns the
    /// generation to pass to [`Self::handle_event_for`].
    pub fn reset(&self, target: impl Into<String>, scratch_dir: Option<PathBuf>) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.target = Some(target.into());
        inner.scratch_dir = scratch_dir;
        inner.state = SyncState::Idle;
        inner.last = SyncProgress::default();
        inner.percent = 0.0;
        inner.in_progress = false;
        inner.generation
    }

    /// Forget the current operation without tracking a new one
    pub fn clear(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.target = None;
        inner.scratch_dir = None;
        inner.state = SyncState::Idle;
        inner.last = SyncProgress::default();
        inner.percent = 0.0;
        inner.in_progress = false;
        inner.generation
    }

    /// Process an event for the current operation
    pub fn handle_event(&self, event: &ChangeEvent) -> Vec<SyncProgress> {
        let generation = self.inner.lock().generation;
        self.handle_event_for(generation, event)
    }

    /// Process an event if `generation` is still the current operation
    ///
    /// Returns the notifications that were delivered, in order.
    pub fn handle_event_for(&self, generation: u64, event: &ChangeEvent) -> Vec<SyncProgress> {
        let mut emitted = Vec::new();
        let mut cleanup = None;

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(generation, current = inner.generation, "dropping event from stale watch");
                return emitted;
            }

            if let ChangeEvent::Started(_) = event {
                inner.state = SyncState::Gathering;
                inner.in_progress = true;
                inner.percent = 0.0;
                emitted.push(SyncProgress::at(0.0));
            }

            match inner.evaluate(event.items()) {
                Some(Outcome::Completed) => {
                    inner.state = SyncState::Completed;
                    inner.percent = 0.0;
                    inner.in_progress = false;
                    cleanup = inner.scratch_dir.clone();
                    emitted.push(SyncProgress::completed());
                }
                Some(Outcome::Failed(message)) => {
                    inner.state = SyncState::Failed;
                    inner.percent = 0.0;
                    inner.in_progress = false;
                    emitted.push(SyncProgress::failed(Error::Upload(message)));
                }
                Some(Outcome::Progress(percent)) => {
                    inner.state = SyncState::InProgress(percent);
                    inner.percent = percent;
                    emitted.push(SyncProgress::at(percent));
                }
                None => {}
            }

            if let Some(last) = emitted.last() {
                inner.last = last.clone();
            }
        }

        for progress in &emitted {
            self.observers.notify(progress);
        }

        if let Some(dir) = cleanup {
            self.remove_scratch(generation, &dir);
        }

        emitted
    }

    /// Remove the staging directory of a completed upload
    ///
    /// Runs under the lock so a `reset` for the next operation either happens
    /// first (and the directory is left alone) or waits until it is gone.
    fn remove_scratch(&self, generation: u64, dir: &Path) {
        let inner = self.inner.lock();
        if inner.generation != generation {
            debug!(dir = %dir.display(), "staging directory belongs to a newer operation");
            return;
        }
        // Best effort; a leftover staging directory is harmless
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!(dir = %dir.display(), "removed staging directory"),
            Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove staging directory"),
        }
    }

    /// Last notification delivered for the current operation
    pub fn progress(&self) -> SyncProgress {
        self.inner.lock().last.clone()
    }

    /// Percent uploaded while in progress; 0 once the operation ends
    pub fn percent(&self) -> f64 {
        self.inner.lock().percent
    }

    pub fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    pub fn in_progress(&self) -> bool {
        self.inner.lock().in_progress
    }
}
