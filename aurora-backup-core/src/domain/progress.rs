//! Upload/download progress model

use std::sync::Arc;

use serde::Serialize;

use super::result::Error;

/// Current known state of an in-flight sync operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncProgress {
    /// 0.0 - 100.0
    pub percent: f64,
    pub completed: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<Error>>,
}

impl SyncProgress {
    pub fn at(percent: f64) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
            completed: false,
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            percent: 100.0,
            completed: true,
            error: None,
        }
    }

    pub fn failed(error: Error) -> Self {
        Self {
            percent: 0.0,
            completed: false,
            error: Some(Arc::new(error)),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

fn serialize_error<S>(error: &Option<Arc<Error>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Tracker state for one sync operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "percent", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Gathering,
    InProgress(f64),
    Completed,
    Failed,
}

impl SyncState {
    /// Completed and Failed end an operation until the next start
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "Idle",
            SyncState::Gathering => "Gathering",
            SyncState::InProgress(_) => "Uploading",
            SyncState::Completed => "Completed",
            SyncState::Failed => "Failed",
        }
    }
}
