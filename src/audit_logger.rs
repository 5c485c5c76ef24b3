//! JSONL audit trail for a workflow run.
//!
//! Each line carries:
//! - a monotonic sequence number for ordering
//! - an ISO 8601 timestamp with microsecond precision
//! - the instance ID and a per-process run ID for correlation
//! - the emitting component and a structured event payload

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::commands::OutboundCommand;
use crate::domain::{InstanceId, LogEntry};

pub struct AuditLogger {
    instance_id: String,
    run_id: String,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single line of the audit file.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub seq: u64,
    pub ts: String,
    pub instance_id: String,
    pub run_id: String,
    pub component: String,
    pub event: Value,
}

impl AuditLogger {
    /// Opens `<dir>/<instance_id>.jsonl` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be opened.
    pub fn new(instance_id: &InstanceId, dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log_path = dir.join(format!("{}.jsonl", sanitize_file_stem(instance_id.as_str())));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            instance_id: instance_id.to_string(),
            run_id: Uuid::new_v4().to_string(),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path,
        })
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Appends one record. Write failures are reported through tracing only.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let record = AuditRecord {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            instance_id: self.instance_id.clone(),
            run_id: self.run_id.clone(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to serialize audit record: {}", e);
                return;
            }
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                tracing::warn!("Failed to write audit record to {}: {}", self.log_path.display(), e);
            }
        }
    }

    pub fn log_entry(&self, entry: &LogEntry) {
        self.log("ExecutionLog", entry);
    }

    pub fn log_command(&self, command: &OutboundCommand) {
        self.log("OutboundCommand", command);
    }

    pub fn log_dropped_event(&self, reason: &str, raw: &Value) {
        self.log(
            "EventChannel",
            serde_json::json!({
                "type": "Dropped",
                "reason": reason,
                "raw": raw,
            }),
        );
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

fn sanitize_file_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "instance".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
#[path = "tests/audit_logger_tests.rs"]
mod tests;
