//! Approval gate for phases that require operator sign-off.
//!
//! A cycle opens on `approval-required` and admits exactly one decision.
//! The gate never changes phase status; only the backend's terminal event
//! does that.

use crate::domain::{CoordinatorError, PhaseNumber};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub phase_number: PhaseNumber,
    pub original_output: String,
    /// Copy-on-first-edit buffer; `None` until the operator edits.
    pub edited_output: Option<String>,
    pub decision: Option<DecisionKind>,
}

impl PendingApproval {
    /// The output an approval would send.
    pub fn effective_output(&self) -> &str {
        self.edited_output
            .as_deref()
            .unwrap_or(&self.original_output)
    }

    pub fn is_edited(&self) -> bool {
        self.edited_output
            .as_deref()
            .is_some_and(|edited| edited != self.original_output)
    }
}

/// A decision accepted by the gate, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDecision {
    pub phase_number: PhaseNumber,
    /// Output for approvals, reason for rejections.
    pub payload: String,
    pub edited: bool,
}

#[derive(Debug, Default)]
pub struct ApprovalGate {
    pending: Option<PendingApproval>,
}

impl ApprovalGate {
    /// Opens a new cycle, discarding any previous buffer and decision.
    pub fn open(&mut self, phase_number: PhaseNumber, output: String) {
        self.pending = Some(PendingApproval {
            phase_number,
            original_output: output,
            edited_output: None,
            decision: None,
        });
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingApproval> {
        self.pending.as_ref()
    }

    /// Pending approval for `phase_number` whose decision has been sent.
    pub fn awaiting_backend(&self, phase_number: PhaseNumber) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.phase_number == phase_number && p.decision.is_some())
    }

    pub fn edit(
        &mut self,
        current: Option<PhaseNumber>,
        text: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        let pending = self.open_cycle(current)?;
        pending.edited_output = Some(text.into());
        Ok(())
    }

    pub fn approve(
        &mut self,
        current: Option<PhaseNumber>,
    ) -> Result<IssuedDecision, CoordinatorError> {
        let pending = self.open_cycle(current)?;
        pending.decision = Some(DecisionKind::Approve);
        Ok(IssuedDecision {
            phase_number: pending.phase_number,
            payload: pending.effective_output().to_string(),
            edited: pending.is_edited(),
        })
    }

    pub fn reject(
        &mut self,
        current: Option<PhaseNumber>,
        reason: &str,
    ) -> Result<IssuedDecision, CoordinatorError> {
        let pending = self.open_cycle(current)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoordinatorError::EmptyRejectionReason);
        }
        pending.decision = Some(DecisionKind::Reject);
        Ok(IssuedDecision {
            phase_number: pending.phase_number,
            payload: reason.to_string(),
            edited: false,
        })
    }

    /// Allows a new decision for the same cycle after a failed or stalled one.
    /// Returns false when there was nothing to re-arm.
    pub fn rearm(&mut self, phase_number: PhaseNumber) -> bool {
        match self.pending.as_mut() {
            Some(pending) if pending.phase_number == phase_number && pending.decision.is_some() => {
                pending.decision = None;
                true
            }
            _ => false,
        }
    }

    fn open_cycle(
        &mut self,
        current: Option<PhaseNumber>,
    ) -> Result<&mut PendingApproval, CoordinatorError> {
        let phase = current.ok_or(CoordinatorError::NoCurrentPhase)?;
        let pending = self
            .pending
            .as_mut()
            .filter(|p| p.phase_number == phase)
            .ok_or(CoordinatorError::NotAwaitingApproval { phase })?;
        if pending.decision.is_some() {
            return Err(CoordinatorError::DecisionAlreadyIssued { phase });
        }
        Ok(pending)
    }
}
