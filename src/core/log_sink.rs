//! Error log sinks.
//!
//! Full failure detail goes here and never to the caller. Provides a bounded
//! in-memory sink for tests and development, and a sink that forwards to
//! `tracing`.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Something was skipped or degraded.
    Warn,
    /// An operation failed.
    Error,
}

/// Log entry structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry identifier.
    pub entry_id: String,
    /// Severity.
    pub level: LogLevel,
    /// Campaign display id, when known.
    pub campaign: Option<String>,
    /// Full error detail.
    pub message: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Log sink abstraction.
pub trait LogSink: Send + Sync {
    /// Write an entry. Sinks must not fail loudly.
    fn write(&self, entry: LogEntry);
}

/// In-memory log sink for testing and dev.
pub struct InMemoryLogSink {
    entries: Mutex<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl InMemoryLogSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    /// Retrieve a snapshot of stored entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl LogSink for InMemoryLogSink {
    fn write(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// Sink that forwards entries to the active `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, entry: LogEntry) {
        let campaign = entry.campaign.as_deref().unwrap_or("-");
        match entry.level {
            LogLevel::Info => {
                tracing::info!(entry_id = %entry.entry_id, campaign, "{}", entry.message);
            }
            LogLevel::Warn => {
                tracing::warn!(entry_id = %entry.entry_id, campaign, "{}", entry.message);
            }
            LogLevel::Error => {
                tracing::error!(entry_id = %entry.entry_id, campaign, "{}", entry.message);
            }
        }
    }
}

/// Helper to build a log entry from context.
pub fn build_log_entry(
    level: LogLevel,
    campaign: Option<String>,
    message: impl Into<String>,
) -> LogEntry {
    LogEntry {
        entry_id: uuid::Uuid::new_v4().to_string(),
        level,
        campaign,
        message: message.into(),
        created_at_ms: now_ms(),
    }
}
