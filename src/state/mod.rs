//! Persisted monitoring state — configuration plus processed/ignored id sets.
//!
//! One JSON document per monitoring profile. All mutation goes through
//! [`StateStore::update`], which persists synchronously and rolls the
//! in-memory copy back if the write fails, so disk and memory never
//! diverge silently.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StateError;

fn default_polling_interval() -> u64 {
    60
}

fn default_processing_delay() -> u64 {
    60
}

fn default_folder() -> String {
    "Inbox".to_string()
}

fn default_subject_pattern() -> String {
    "Your Webex meeting content is available:".to_string()
}

/// Durable record of a monitoring session.
///
/// Invariants: `processed_ids` and `ignored_ids` are disjoint — an
/// identifier moves from unseen to exactly one of them and never back.
/// `last_check_time` only moves forward across successful poll cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    /// Mailbox folder being watched.
    #[serde(default = "default_folder")]
    pub monitored_folder: String,
    /// Exclusive lower bound for new-item queries. `None` until the first
    /// poll establishes a baseline.
    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,
    /// Item identifiers approved and completed.
    #[serde(default)]
    pub processed_ids: BTreeSet<String>,
    /// Item identifiers explicitly declined by the user.
    #[serde(default)]
    pub ignored_ids: BTreeSet<String>,
    /// Seconds between poll cycles.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,
    /// Minimum spacing between two consecutive item completions.
    #[serde(default = "default_processing_delay")]
    pub processing_delay_seconds: u64,
    /// Literal substring filter applied to email subjects.
    #[serde(default = "default_subject_pattern")]
    pub subject_pattern: String,
    /// Whether the monitoring loop should run.
    #[serde(default)]
    pub monitoring_enabled: bool,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            monitored_folder: default_folder(),
            last_check_time: None,
            processed_ids: BTreeSet::new(),
            ignored_ids: BTreeSet::new(),
            polling_interval_seconds: default_polling_interval(),
            processing_delay_seconds: default_processing_delay(),
            subject_pattern: default_subject_pattern(),
            monitoring_enabled: false,
        }
    }
}

impl MonitorState {
    /// Check whether an identifier was already processed or ignored.
    pub fn is_handled(&self, id: &str) -> bool {
        self.processed_ids.contains(id) || self.ignored_ids.contains(id)
    }

    /// Record an identifier as approved-and-completed.
    pub fn mark_processed(&mut self, id: &str) -> Result<(), StateError> {
        if self.ignored_ids.contains(id) {
            return Err(StateError::IdentifierConflict {
                id: id.to_string(),
                existing: "ignored",
            });
        }
        self.processed_ids.insert(id.to_string());
        Ok(())
    }

    /// Record an identifier as declined by the user.
    pub fn mark_ignored(&mut self, id: &str) -> Result<(), StateError> {
        if self.processed_ids.contains(id) {
            return Err(StateError::IdentifierConflict {
                id: id.to_string(),
                existing: "processed",
            });
        }
        self.ignored_ids.insert(id.to_string());
        Ok(())
    }

    /// Advance the poll checkpoint. Older timestamps are ignored so the
    /// checkpoint never moves backwards.
    pub fn advance_check_time(&mut self, observed: DateTime<Utc>) {
        match self.last_check_time {
            Some(current) if observed <= current => {}
            _ => self.last_check_time = Some(observed),
        }
    }
}

/// Owner of the persisted [`MonitorState`] document.
///
/// Single writer: the monitoring loop. Readers take a cloned snapshot.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: MonitorState,
}

impl StateStore {
    /// Load state from `path`, or start from defaults if the file does
    /// not exist yet.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| StateError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            serde_json::from_str(&raw).map_err(|e| StateError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            info!(path = %path.display(), "No existing state file, starting fresh");
            MonitorState::default()
        };
        Ok(Self { path, state })
    }

    /// Create a store with explicit initial state (not yet persisted).
    pub fn with_state(path: impl Into<PathBuf>, state: MonitorState) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }

    /// Current state, read-only.
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Consistent snapshot for readers outside the monitoring loop.
    pub fn snapshot(&self) -> MonitorState {
        self.state.clone()
    }

    /// Apply a mutation and persist it synchronously.
    ///
    /// The mutation runs on a copy; the in-memory state is only replaced
    /// after the copy has been durably written. A failed write discards
    /// the mutation entirely.
    pub fn update<F>(&mut self, mutate: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut MonitorState) -> Result<(), StateError>,
    {
        let mut next = self.state.clone();
        mutate(&mut next)?;
        Self::persist(&self.path, &next)?;
        self.state = next;
        Ok(())
    }

    /// Write the document with a temp-file-then-rename commit so a crash
    /// mid-write leaves the previous snapshot intact.
    fn persist(path: &Path, state: &MonitorState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StateError::Persist {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "State persisted");
        Ok(())
    }
}
