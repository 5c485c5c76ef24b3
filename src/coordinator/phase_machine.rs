//! Lifecycle of the current phase.
//!
//! `pending → in_progress → {completed | failed}`. Terminal records move into
//! [`History`] immediately and there is no way back; a retry is a new start.

use crate::coordinator::ledger::History;
use crate::domain::{InstanceId, PhaseNumber, PhaseRecord, PhaseStatus};
use chrono::Utc;

pub struct PhaseStateMachine {
    instance_id: InstanceId,
    current: Option<PhaseRecord>,
    history: History,
}

impl PhaseStateMachine {
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            current: None,
            history: History::default(),
        }
    }

    /// Starts a new current phase. Returns the unfinished record it replaced.
    pub fn start(
        &mut self,
        phase_number: PhaseNumber,
        phase_name: &str,
        agent: &str,
    ) -> Option<PhaseRecord> {
        let record = PhaseRecord::started(self.instance_id.clone(), phase_number, phase_name, agent);
        self.current.replace(record)
    }

    /// Completes the current phase if it is `phase_number`.
    ///
    /// A non-empty `output` replaces the streamed output; otherwise the
    /// accumulated stream is kept.
    pub fn complete(
        &mut self,
        phase_number: PhaseNumber,
        output: Option<String>,
    ) -> Option<&PhaseRecord> {
        let mut record = self.take_current(phase_number)?;
        if let Some(output) = output.filter(|o| !o.is_empty()) {
            record.output = output;
        }
        record.status = PhaseStatus::Completed;
        record.completed_at = Some(Utc::now());
        Some(self.history.append(record))
    }

    /// Fails the current phase if it is `phase_number`.
    pub fn fail(&mut self, phase_number: PhaseNumber, error: String) -> Option<&PhaseRecord> {
        let mut record = self.take_current(phase_number)?;
        record.status = PhaseStatus::Failed;
        record.error = Some(error);
        record.completed_at = Some(Utc::now());
        Some(self.history.append(record))
    }

    fn take_current(&mut self, phase_number: PhaseNumber) -> Option<PhaseRecord> {
        if self.is_current(phase_number) {
            self.current.take()
        } else {
            None
        }
    }

    pub fn is_current(&self, phase_number: PhaseNumber) -> bool {
        self.current
            .as_ref()
            .is_some_and(|r| r.phase_number == phase_number)
    }

    pub fn current(&self) -> Option<&PhaseRecord> {
        self.current.as_ref()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut PhaseRecord> {
        self.current.as_mut()
    }

    pub fn current_number(&self) -> Option<PhaseNumber> {
        self.current.as_ref().map(|r| r.phase_number)
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}
