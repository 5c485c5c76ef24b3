//! Append-only history of finished phases and the run's execution log.

use crate::domain::{LogEntry, LogLevel, PhaseNumber, PhaseRecord};

/// Finished phase records in completion order. Records are never mutated
/// once appended.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<PhaseRecord>,
}

impl History {
    pub(crate) fn append(&mut self, record: PhaseRecord) -> &PhaseRecord {
        debug_assert!(record.status.is_terminal());
        self.records.push(record);
        let last = self.records.len() - 1;
        &self.records[last]
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub(crate) fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        phase_number: Option<PhaseNumber>,
    ) -> &LogEntry {
        self.entries
            .push(LogEntry::new(level, message, phase_number));
        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
