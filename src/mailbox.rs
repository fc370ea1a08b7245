//! Mailbox collaborator — the only window onto the mail store.
//!
//! Connection management lives behind [`Mailbox`]; the monitoring loop
//! only sees candidate emails and transcript handles. A filesystem spool
//! implementation is provided for local runs and demos.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MailboxError;

/// A mailbox item matching the monitoring filter, not yet handled.
///
/// Transient — created by a poll query, consumed within one loop
/// iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEmail {
    /// Stable mailbox identifier.
    pub id: String,
    pub subject: String,
    pub received_time: DateTime<Utc>,
    /// Opaque handle for fetching the transcript lazily.
    pub transcript_ref: String,
}

/// Mailbox collaborator contract.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List items in `folder` received strictly after `since` whose
    /// subject contains `subject_contains`. Implementations should return
    /// items oldest first; the caller re-sorts defensively.
    async fn list_items(
        &self,
        folder: &str,
        since: Option<DateTime<Utc>>,
        subject_contains: &str,
    ) -> Result<Vec<CandidateEmail>, MailboxError>;

    /// Fetch the transcript content behind an opaque handle.
    async fn fetch_transcript(&self, transcript_ref: &str) -> Result<String, MailboxError>;

    /// Create a task in the mail client's task list (synced to the
    /// configured target).
    async fn create_task(
        &self,
        title: &str,
        due_date: NaiveDate,
        category: &str,
        sync_target: &str,
    ) -> Result<(), MailboxError>;
}

// ── Filesystem spool implementation ─────────────────────────────────

/// One spool entry on disk.
#[derive(Debug, Serialize, Deserialize)]
struct SpoolEntry {
    id: String,
    subject: String,
    received_time: DateTime<Utc>,
    /// Path of the transcript file, relative to the spool root.
    transcript_path: String,
}

/// Filesystem-backed mailbox for local runs: each folder is a directory
/// of JSON entries pointing at transcript files; created tasks land as
/// JSON documents under `tasks/`.
#[derive(Debug, Clone)]
pub struct FsMailbox {
    root: PathBuf,
}

impl FsMailbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Mailbox for FsMailbox {
    async fn list_items(
        &self,
        folder: &str,
        since: Option<DateTime<Utc>>,
        subject_contains: &str,
    ) -> Result<Vec<CandidateEmail>, MailboxError> {
        let dir = self.root.join(folder);
        if !dir.is_dir() {
            return Err(MailboxError::FolderNotFound(folder.to_string()));
        }

        let pattern = subject_contains.to_lowercase();
        let mut items = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            let spool: SpoolEntry = serde_json::from_str(&raw)
                .map_err(|e| MailboxError::Query(format!("{}: {e}", path.display())))?;

            if !spool.subject.to_lowercase().contains(&pattern) {
                continue;
            }
            if let Some(since) = since
                && spool.received_time <= since
            {
                continue;
            }
            items.push(CandidateEmail {
                id: spool.id,
                subject: spool.subject,
                received_time: spool.received_time,
                transcript_ref: spool.transcript_path,
            });
        }

        items.sort_by(|a, b| {
            a.received_time
                .cmp(&b.received_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        debug!(folder, count = items.len(), "Spool query complete");
        Ok(items)
    }

    async fn fetch_transcript(&self, transcript_ref: &str) -> Result<String, MailboxError> {
        std::fs::read_to_string(self.root.join(transcript_ref)).map_err(|e| {
            MailboxError::TranscriptFetch {
                reference: transcript_ref.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn create_task(
        &self,
        title: &str,
        due_date: NaiveDate,
        category: &str,
        sync_target: &str,
    ) -> Result<(), MailboxError> {
        let dir = self.root.join("tasks");
        std::fs::create_dir_all(&dir)?;
        let doc = serde_json::json!({
            "title": title,
            "due_date": due_date,
            "category": category,
            "sync_target": sync_target,
        });
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| MailboxError::TaskCreation(e.to_string()))?;
        let file = dir.join(format!("{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&file, json).map_err(|e| MailboxError::TaskCreation(e.to_string()))?;
        Ok(())
    }
}
