//! Remote container entries and change notifications

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suffix the storage provider appends to entries not yet present locally
pub const PLACEHOLDER_SUFFIX: &str = ".icloud";

/// An entry in a remote container listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name as listed (placeholders keep their reserved form)
    pub name: String,
    /// Path of the listed entry
    pub path: PathBuf,
    pub is_directory: bool,
    /// True when only a placeholder exists locally
    pub is_placeholder: bool,
    /// Where the content lives once materialized
    pub local_path: Option<PathBuf>,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    /// Build an entry from a listed path, recognizing placeholders by name
    pub fn from_listing(path: PathBuf, is_directory: bool, modified: Option<DateTime<Utc>>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_placeholder = !is_directory && is_placeholder_name(&name);
        let local_path = if is_placeholder {
            None
        } else {
            Some(path.clone())
        };

        Self {
            name,
            path,
            is_directory,
            is_placeholder,
            local_path,
            modified,
        }
    }

    /// Name the entry has once its content is on disk
    pub fn materialized_name(&self) -> String {
        if self.is_placeholder {
            materialized_name(&self.name)
        } else {
            self.name.clone()
        }
    }

    /// Path the content will have once materialized
    pub fn materialized_path(&self) -> PathBuf {
        match &self.local_path {
            Some(path) => path.clone(),
            None => sibling(&self.path, &self.materialized_name()),
        }
    }
}

/// Whether a file name uses the reserved placeholder form
pub fn is_placeholder_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PLACEHOLDER_SUFFIX) && name.len() > PLACEHOLDER_SUFFIX.len() + 1
}

/// `.{name}.icloud` -> `{name}`
pub fn materialized_name(name: &str) -> String {
    name.strip_prefix('.')
        .and_then(|n| n.strip_suffix(PLACEHOLDER_SUFFIX))
        .unwrap_or(name)
        .to_string()
}

/// `{name}` -> `.{name}.icloud`
pub fn placeholder_name(name: &str) -> String {
    format!(".{}{}", name, PLACEHOLDER_SUFFIX)
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Sync-state attributes of one result of a change watch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub name: String,
    pub path: PathBuf,
    pub is_uploaded: Option<bool>,
    pub is_uploading: Option<bool>,
    /// Upload fraction in percent (0-100)
    pub percent_uploaded: Option<f64>,
    pub upload_error: Option<String>,
}

impl TrackedItem {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            ..Default::default()
        }
    }

    pub fn uploaded(mut self, uploaded: bool, uploading: bool) -> Self {
        self.is_uploaded = Some(uploaded);
        self.is_uploading = Some(uploading);
        self
    }

    pub fn percent(mut self, percent: f64) -> Self {
        self.percent_uploaded = Some(percent);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.upload_error = Some(message.into());
        self
    }
}

/// Notification delivered by a change watch
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The watch began gathering results
    Started(Vec<TrackedItem>),
    /// Results changed
    Updated(Vec<TrackedItem>),
}

impl ChangeEvent {
    pub fn items(&self) -> &[TrackedItem] {
        match self {
            ChangeEvent::Started(items) | ChangeEvent::Updated(items) => items,
        }
    }
}

/// Which entries a change watch reports on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchPredicate {
    /// File names ending with the given extension (without dot)
    Extension(String),
    /// File names containing the given fragment
    NameContains(String),
}

impl WatchPredicate {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            WatchPredicate::Extension(ext) => name
                .rsplit_once('.')
                .map(|(_, e)| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
            WatchPredicate::NameContains(fragment) => name.contains(fragment.as_str()),
        }
    }
}
