// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory session log.
//!
//! Append-only sequence of tagged messages, kept for the lifetime of the
//! process and exportable as plain text for diagnostics. Live consumers can
//! tail new entries through a subscription.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// A live log notification delivered to subscribers.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub tag: String,
    pub message: String,
}

/// A single journaled entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub tag: String,
    pub message: String,
}

/// Append-only session log with a live tail.
pub struct LogJournal {
    entries: RwLock<Vec<LogEntry>>,
    tx: broadcast::Sender<LogEvent>,
}

impl Default for LogJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl LogJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(128);
        Self {
            entries: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Append an entry and notify live subscribers.
    pub fn append(&self, tag: &str, message: impl Into<String>) {
        let message = message.into();
        debug!("{}: {}", tag, message);

        self.entries.write().push(LogEntry {
            timestamp: Local::now(),
            tag: tag.to_string(),
            message: message.clone(),
        });

        // No subscribers is fine; the journal itself is the record.
        let _ = self.tx.send(LogEvent {
            tag: tag.to_string(),
            message,
        });
    }

    /// Subscribe to entries appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    /// Number of journaled entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Render the full journal as shareable text, one entry per line.
    pub fn export(&self) -> String {
        let entries = self.entries.read();
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&format!(
                "{} {}: {}\n",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.tag,
                entry.message
            ));
        }
        out
    }
}
