use crate::types::{Decision, Operation, PermissionMode, RiskTier};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDecision {
    pub allowed: bool,
    pub reason: String,
}

/// One gate decision, as recorded. Entries are never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub operation_name: String,
    pub tier: RiskTier,
    pub mode: PermissionMode,
    pub parameters_snapshot: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub decision: AuditDecision,
}

impl AuditEntry {
    pub fn new(operation: &Operation, mode: PermissionMode, decision: &Decision) -> Self {
        Self {
            operation_name: operation.name.clone(),
            tier: decision.tier,
            mode,
            parameters_snapshot: operation.parameters.clone(),
            timestamp: Utc::now(),
            decision: AuditDecision {
                allowed: decision.allowed,
                reason: decision.reason.clone(),
            },
        }
    }
}

/// Append-only decision log owned by one enforcer.
///
/// Appends are serialized through a mutex. With a capacity set the log acts
/// as a ring buffer; with a sink every entry is also written as one JSON line.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: Option<usize>,
    sink: Option<JsonlSink>,
}

#[derive(Debug)]
struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // An entry is pushed in a single step, so a panic elsewhere cannot leave
    // the queue half-written.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Also append each entry to `path` as a JSON line. The file and its
    /// parent directory are created if needed.
    pub fn with_sink(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit log directory {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        self.sink = Some(JsonlSink {
            path,
            file: Mutex::new(file),
        });
        Ok(self)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn sink_path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|sink| sink.path.as_path())
    }

    /// Append an entry. The in-memory append always happens; an error is
    /// returned only if writing to the sink fails.
    pub fn record(&self, entry: AuditEntry) -> Result<()> {
        let line = match &self.sink {
            Some(_) => Some(serde_json::to_string(&entry).context("Failed to serialize audit entry")?),
            None => None,
        };

        debug!(
            "Audit: {} ({}) in {} mode -> allowed={}",
            entry.operation_name, entry.tier, entry.mode, entry.decision.allowed
        );

        {
            let mut entries = lock(&self.entries);
            entries.push_back(entry);
            if let Some(capacity) = self.capacity {
                while entries.len() > capacity {
                    entries.pop_front();
                }
            }
        }

        if let (Some(sink), Some(line)) = (&self.sink, line) {
            let mut file = lock(&sink.file);
            writeln!(file, "{line}")
                .and_then(|_| file.flush())
                .with_context(|| format!("Failed to write audit log {}", sink.path.display()))?;
        }

        Ok(())
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn export(&self) -> Vec<AuditEntry> {
        lock(&self.entries).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all in-memory entries. Meant for tests and debugging only; the
    /// persisted sink is left untouched.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

/// Load a JSON-lines audit log written by [`AuditLog::with_sink`].
pub fn read_jsonl(path: &Path) -> Result<Vec<AuditEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read audit log {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("Malformed audit entry at {}:{}", path.display(), index + 1)
            })
        })
        .collect()
}
