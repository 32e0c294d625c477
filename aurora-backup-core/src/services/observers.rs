//! Non-owning multicast of progress notifications

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::domain::SyncProgress;

/// Receives backup progress
pub trait BackupObserver: Send + Sync {
    fn on_backup_progress(&self, progress: &SyncProgress);
}

/// Handle returned when registering an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registry holding observers without owning them
///
/// Observers that have been dropped are skipped and pruned on the next
/// notification. Delivery is synchronous, in no particular order.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Weak<dyn BackupObserver>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<O: BackupObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.add_weak(weak)
    }

    /// Register an observer that is already type-erased
    pub fn add_weak(&self, observer: Weak<dyn BackupObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, observer));
        id
    }

    /// Unregister; returns false if the id was unknown
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(other, _)| *other != id);
        observers.len() != before
    }

    /// Deliver `progress` to every live observer; returns how many received it
    pub fn notify(&self, progress: &SyncProgress) -> usize {
        // Upgrade under the lock, call outside it so observers may re-enter
        let live: Vec<Arc<dyn BackupObserver>> = {
            let mut observers = self.observers.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        for observer in &live {
            observer.on_backup_progress(progress);
        }
        live.len()
    }

    /// Number of registered observers still alive
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
