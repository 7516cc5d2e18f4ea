//! Key lifecycle audit log.
//!
//! Records provisioning and every failed key resolution. The log is
//! append-only and never holds key material, wrapped or raw: only the user
//! id, the event kind, and when it happened. Pluggable sinks forward
//! records to files or external stores.
//!
//! The in-memory copy is bounded: once it holds `retention` records the
//! oldest is dropped for each new one. Forward sinks see every record, so
//! attach one when the full history matters.

use std::collections::vec_deque::{self, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sink that receives audit records. Implement this to forward records
/// to a file, database, or log pipeline.
pub trait AuditSink: Send {
    /// Append a record. Called once per key event.
    fn append(&mut self, record: AuditRecord);
}

/// What happened to a user's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEvent {
    /// A fresh key was generated, wrapped, and stored.
    Provisioned,
    /// A note operation found no wrapped key for the user.
    Missing,
    /// Stored ciphertext was refused: the wrapped key failed to unwrap, or
    /// a note would not open under the key that did.
    Rejected,
}

/// A permanent record of a key event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub user_id: String,
    pub event: KeyEvent,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn now(user_id: impl Into<String>, event: KeyEvent) -> Self {
        Self {
            user_id: user_id.into(),
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Records kept in memory by [`AuditLog::new`].
pub const DEFAULT_RETENTION: usize = 10_000;

/// An append-only log of key events.
pub struct AuditLog {
    records: VecDeque<AuditRecord>,
    retention: usize,
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("retention", &self.retention)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `retention` records in memory.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            records: VecDeque::new(),
            retention,
            forward_sinks: Vec::new(),
        }
    }

    /// Add a sink to receive a copy of every record, on top of the
    /// in-memory log.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    /// Consume the log, keeping only its forward sinks.
    pub fn into_sinks(self) -> Vec<Box<dyn AuditSink>> {
        self.forward_sinks
    }

    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        if self.retention == 0 {
            return;
        }
        while self.records.len() >= self.retention {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records, oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, AuditRecord> {
        self.records.iter()
    }

    /// All records concerning one user, oldest first.
    pub fn for_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a AuditRecord> + 'a {
        self.records.iter().filter(move |r| r.user_id == user_id)
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}").and_then(|_| self.file.flush()) {
                    tracing::warn!(error = %e, "failed to write audit record");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialise audit record"),
        }
    }
}
