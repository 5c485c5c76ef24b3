use crate::coordinator::approval::PendingApproval;
use crate::coordinator::input_mediator::PendingInput;
use crate::domain::{InstanceId, PhaseRecord, Remediation, SurfacedError};
use serde::Serialize;

/// Read-only view of the coordinator, published after every event or
/// operator action except bare output chunks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSnapshot {
    pub instance_id: InstanceId,
    pub current_phase: Option<PhaseRecord>,
    pub history: Vec<PhaseRecord>,
    pub approval: Option<PendingApproval>,
    pub pending_input: Option<PendingInputView>,
    pub remediation: Option<Remediation>,
    pub errors: Vec<SurfacedError>,
    pub log_len: usize,
    pub commands_in_flight: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInputView {
    #[serde(flatten)]
    pub input: PendingInput,
    pub can_submit: bool,
    /// Why submit is disabled, when it is.
    pub validation_error: Option<String>,
}

impl CoordinatorSnapshot {
    pub fn empty(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            current_phase: None,
            history: Vec::new(),
            approval: None,
            pending_input: None,
            remediation: None,
            errors: Vec::new(),
            log_len: 0,
            commands_in_flight: 0,
        }
    }

    /// True when an approval cycle is open and no decision has been sent.
    pub fn awaiting_decision(&self) -> bool {
        self.approval.as_ref().is_some_and(|a| a.decision.is_none())
    }
}
