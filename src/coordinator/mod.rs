//! Workflow Execution Coordinator.
//!
//! Owns one workflow run: the current phase and its history, the approval
//! gate, the pending input request, remediation and surfaced errors. Every
//! mutation goes through `&mut self` from a single consumer; outbound
//! commands are fire-and-forget and report back via [`CommandOutcome`].
//!
//! Operator actions that send a command (`approve`, `reject`,
//! `submit_input`) spawn onto the current tokio runtime. Called outside one,
//! the command is not sent and its outcome surfaces as a failed command.

pub mod approval;
pub mod input_mediator;
pub mod ledger;
pub mod output;
pub mod phase_machine;
pub mod probe;
pub mod remediation;
pub mod runner;
pub mod snapshot;

pub use approval::{ApprovalGate, DecisionKind, PendingApproval};
pub use input_mediator::{PendingInput, UserInputMediator};
pub use ledger::{ExecutionLog, History};
pub use phase_machine::PhaseStateMachine;
pub use probe::{RemediationProbe, RemediationStatus, SystemProbe};
pub use remediation::ErrorClassifier;
pub use runner::{run, OperatorAction, OperatorHandle, RunReport};
pub use snapshot::{CoordinatorSnapshot, PendingInputView};

use crate::audit_logger::AuditLogger;
use crate::channel::{
    ApprovalRequired, BackendEvent, EventChannelAdapter, EventSubscription, PhaseCompleted,
    PhaseEvent, PhaseFailed, PhaseStarted, Routed,
};
use crate::commands::{CommandDispatcher, CommandOutcome, CommandPort, OutboundCommand};
use crate::config::CoordinatorConfig;
use crate::domain::{
    CoordinatorError, InputAnswer, InputValidationError, InstanceId, LogEntry, LogLevel,
    PhaseNumber, PhaseRecord, Remediation, RequestId, SurfacedError, SurfacedErrorKind,
    UserInputRequest, WorkflowDefinition,
};
use output::OutputAccumulator;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

pub struct WorkflowCoordinator {
    definition: WorkflowDefinition,
    adapter: EventChannelAdapter,
    phases: PhaseStateMachine,
    output: OutputAccumulator,
    approval: ApprovalGate,
    input: UserInputMediator,
    classifier: ErrorClassifier,
    log: ExecutionLog,
    remediation: Option<Remediation>,
    errors: Vec<SurfacedError>,
    next_error_id: u64,
    dispatcher: CommandDispatcher,
    outcomes: Option<mpsc::UnboundedReceiver<CommandOutcome>>,
    stall_timeout: Option<Duration>,
    stall_deadline: Option<(PhaseNumber, Instant)>,
    audit: Option<Arc<AuditLogger>>,
    subscription: Option<EventSubscription>,
    snapshot_tx: watch::Sender<CoordinatorSnapshot>,
}

impl WorkflowCoordinator {
    /// Creates a coordinator for run `instance_id`.
    ///
    /// Returns the coordinator and a watch receiver for state snapshots.
    pub fn new(
        instance_id: InstanceId,
        definition: WorkflowDefinition,
        config: &CoordinatorConfig,
        port: Arc<dyn CommandPort>,
    ) -> anyhow::Result<(Self, watch::Receiver<CoordinatorSnapshot>)> {
        let classifier = ErrorClassifier::new(&config.remediation)?;
        let (dispatcher, outcomes) = CommandDispatcher::new(port);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(CoordinatorSnapshot::empty(instance_id.clone()));

        let coordinator = Self {
            definition,
            adapter: EventChannelAdapter::new(instance_id.clone()),
            phases: PhaseStateMachine::new(instance_id),
            output: OutputAccumulator::default(),
            approval: ApprovalGate::default(),
            input: UserInputMediator::default(),
            classifier,
            log: ExecutionLog::default(),
            remediation: None,
            errors: Vec::new(),
            next_error_id: 0,
            dispatcher,
            outcomes: Some(outcomes),
            stall_timeout: config.approval_stall_timeout(),
            stall_deadline: None,
            audit: None,
            subscription: None,
            snapshot_tx,
        };
        Ok((coordinator, snapshot_rx))
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Ties the backend subscription feeding this run to the coordinator's
    /// lifetime; [`Self::close`] aborts it.
    pub fn with_subscription(mut self, subscription: EventSubscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    /// Routes one raw backend message. Foreign and malformed messages leave
    /// the run untouched.
    pub fn handle_raw(&mut self, raw: &Value) {
        match self.adapter.route(raw) {
            Routed::Event(event) => self.handle_event(event),
            Routed::Foreign(_) => {}
            Routed::Dropped(err) => {
                if let Some(audit) = &self.audit {
                    audit.log_dropped_event(&err.to_string(), raw);
                }
            }
        }
    }

    /// Applies one event. Output chunks alone do not publish a snapshot;
    /// the next published change carries the accumulated output.
    pub fn handle_event(&mut self, event: BackendEvent) {
        let publish = match event {
            BackendEvent::PhaseStarted(e) => {
                self.on_phase_started(e);
                true
            }
            BackendEvent::PhaseCompleted(e) => {
                self.on_phase_completed(e);
                true
            }
            BackendEvent::PhaseFailed(e) => {
                self.on_phase_failed(e);
                true
            }
            BackendEvent::ApprovalRequired(e) => {
                self.on_approval_required(e);
                true
            }
            BackendEvent::PhaseEvent(e) => self.on_phase_event(e),
            BackendEvent::UserInputRequired(request) => {
                self.on_user_input_required(request);
                true
            }
        };
        if publish {
            self.publish();
        }
    }

    fn on_phase_started(&mut self, event: PhaseStarted) {
        let n = event.phase_number;
        let replaced = self.phases.start(n, &event.phase_name, &event.agent);
        self.approval.clear();
        self.remediation = None;
        self.stall_deadline = None;

        let mut message = format!("Phase {} started: {} ({})", n, event.phase_name, event.agent);
        if let Some(old) = replaced {
            tracing::warn!(
                "Phase {} started while phase {} was still running; abandoning phase {}",
                n,
                old.phase_number,
                old.phase_number
            );
            message.push_str(&format!(" [replaced unfinished phase {}]", old.phase_number));
        }
        self.record(LogLevel::Info, message, Some(n));
    }

    fn on_phase_completed(&mut self, event: PhaseCompleted) {
        let n = event.phase_number;
        let Some(record) = self.phases.complete(n, event.output) else {
            tracing::debug!("Ignoring stale phase-completed for phase {}", n);
            return;
        };
        let message = format!("Phase {} completed: {}", n, record.phase_name);
        self.end_cycle(n);
        self.record(LogLevel::Success, message, Some(n));
    }

    fn on_phase_failed(&mut self, event: PhaseFailed) {
        let n = event.phase_number;
        let classification = self.classifier.classify(&event.error);
        let Some(record) = self.phases.fail(n, event.error) else {
            tracing::debug!("Ignoring stale phase-failed for phase {}", n);
            return;
        };
        let phase_name = record.phase_name.clone();
        let agent = record.agent.clone();
        let error = record.error.clone().unwrap_or_default();
        self.end_cycle(n);

        match classification {
            Some(classification) => {
                tracing::warn!(
                    "Phase {} failed with recoverable condition: {}",
                    n,
                    classification.kind.display_name()
                );
                self.record(
                    LogLevel::Error,
                    format!(
                        "Phase {} failed ({}): {}",
                        n,
                        classification.kind.display_name(),
                        classification.detail
                    ),
                    Some(n),
                );
                self.remediation = Some(Remediation {
                    kind: classification.kind,
                    detail: classification.detail,
                    agent,
                    phase_number: n,
                });
            }
            None => {
                self.surface(
                    SurfacedErrorKind::PhaseFailed,
                    format!("Phase {} ({}) failed: {}", n, phase_name, error),
                    Some(n),
                );
                self.record(
                    LogLevel::Error,
                    format!("Phase {} failed: {}", n, error),
                    Some(n),
                );
            }
        }
    }

    fn on_approval_required(&mut self, event: ApprovalRequired) {
        let n = event.phase_number;
        let Some(current) = self.phases.current().filter(|r| r.phase_number == n) else {
            tracing::debug!("Ignoring approval-required for phase {} (not current)", n);
            return;
        };
        if !self.definition.requires_approval(n) {
            tracing::warn!(
                "Ignoring approval-required for phase {}: definition does not require approval",
                n
            );
            return;
        }

        let output = event
            .output
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| current.output.clone());
        self.approval.open(n, output);
        self.stall_deadline = None;
        self.record(
            LogLevel::Warning,
            format!("Phase {} requires approval", n),
            Some(n),
        );
    }

    /// Returns true when the event produced a log entry.
    fn on_phase_event(&mut self, event: PhaseEvent) -> bool {
        let outcome = self.output.accept(self.phases.current_mut(), &event);
        if outcome != output::ChunkOutcome::Appended && event.output_chunk().is_some() {
            tracing::debug!("Dropping output chunk: {:?}", outcome);
        }

        let Some(message) = event.message.as_deref().filter(|m| !m.trim().is_empty()) else {
            return false;
        };
        let phase = event.phase_number.or_else(|| self.phases.current_number());
        self.record(LogLevel::Info, message, phase);
        true
    }

    fn on_user_input_required(&mut self, request: UserInputRequest) {
        let new_id = request.request_id.clone();
        let message = match self.input.receive(request.clone()) {
            Some(old_id) => {
                tracing::warn!("Input request {} overridden by {}", old_id, new_id);
                format!(
                    "Input request {} replaced by {}: {}",
                    old_id, new_id, request.prompt
                )
            }
            None => format!("Input requested by {}: {}", request.node_name, request.prompt),
        };
        let phase = self.phases.current_number();
        self.record(LogLevel::Warning, message, phase);
    }

    /// A terminal event closes the approval cycle for its phase.
    fn end_cycle(&mut self, phase_number: PhaseNumber) {
        if self
            .approval
            .pending()
            .is_some_and(|p| p.phase_number == phase_number)
        {
            self.approval.clear();
        }
        if self
            .stall_deadline
            .is_some_and(|(phase, _)| phase == phase_number)
        {
            self.stall_deadline = None;
        }
    }

    // ------------------------------------------------------------------
    // Operator actions
    // ------------------------------------------------------------------

    /// Replaces the approval edit buffer.
    pub fn edit_approval_output(&mut self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        let result = self.approval.edit(self.phases.current_number(), text);
        self.publish();
        result
    }

    /// Sends `approve-phase` with the edited buffer, or the original output.
    pub fn approve(&mut self) -> Result<(), CoordinatorError> {
        let decision = self.approval.approve(self.phases.current_number())?;
        let n = decision.phase_number;
        self.send(OutboundCommand::ApprovePhase {
            instance_id: self.instance_id().clone(),
            phase_number: n,
            output: decision.payload,
        });
        let message = if decision.edited {
            format!("Phase {} approved with edited output", n)
        } else {
            format!("Phase {} approved", n)
        };
        self.record(LogLevel::Success, message, Some(n));
        self.publish();
        Ok(())
    }

    pub fn reject(&mut self, reason: &str) -> Result<(), CoordinatorError> {
        let decision = self.approval.reject(self.phases.current_number(), reason)?;
        let n = decision.phase_number;
        let message = format!("Phase {} rejected: {}", n, decision.payload);
        self.send(OutboundCommand::RejectPhase {
            instance_id: self.instance_id().clone(),
            phase_number: n,
            reason: decision.payload,
        });
        self.record(LogLevel::Warning, message, Some(n));
        self.publish();
        Ok(())
    }

    pub fn set_input_answer(&mut self, answer: InputAnswer) -> Result<(), CoordinatorError> {
        let result = self.input.set_answer(answer);
        self.publish();
        result
    }

    /// Validates the pending answer and sends `send-user-input`.
    pub fn submit_input(&mut self, request_id: &RequestId) -> Result<(), CoordinatorError> {
        let (request_id, value) = self.input.take_submission(request_id)?;
        let message = format!("Submitted input for request {}", request_id);
        self.send(OutboundCommand::SendUserInput { request_id, value });
        let phase = self.phases.current_number();
        self.record(LogLevel::Info, message, phase);
        self.publish();
        Ok(())
    }

    /// Drops the pending request; nothing is sent to the backend.
    pub fn cancel_input(&mut self, request_id: &RequestId) -> Result<(), CoordinatorError> {
        let request = self.input.cancel(request_id)?;
        let phase = self.phases.current_number();
        self.record(
            LogLevel::Info,
            format!("Input request {} cancelled", request.request_id),
            phase,
        );
        self.publish();
        Ok(())
    }

    pub fn can_submit_input(&self) -> bool {
        self.input.can_submit()
    }

    pub fn input_validation(&self) -> Option<Result<InputAnswer, InputValidationError>> {
        self.input.validation()
    }

    /// Returns false when no error has that id.
    pub fn dismiss_error(&mut self, id: u64) -> bool {
        let before = self.errors.len();
        self.errors.retain(|e| e.id != id);
        let dismissed = self.errors.len() != before;
        self.publish();
        dismissed
    }

    pub fn dismiss_remediation(&mut self) -> Option<Remediation> {
        let remediation = self.remediation.take();
        self.publish();
        remediation
    }

    // ------------------------------------------------------------------
    // Outbound commands and the approval stall timer
    // ------------------------------------------------------------------

    fn send(&mut self, command: OutboundCommand) {
        if let Some(audit) = &self.audit {
            audit.log_command(&command);
        }
        let id = self.dispatcher.dispatch(command);
        tracing::debug!("Dispatched outbound command #{}", id);
    }

    pub fn handle_command_outcome(&mut self, outcome: CommandOutcome) {
        self.dispatcher.settled();
        let decision_phase = outcome.command.decision_phase();

        match outcome.result {
            Ok(()) => {
                tracing::debug!("Command #{} ({}) acknowledged", outcome.id, outcome.command.name());
                if let (Some(n), Some(timeout)) = (decision_phase, self.stall_timeout) {
                    if self.approval.awaiting_backend(n) {
                        // An unrepresentable deadline means the decision never stalls.
                        self.stall_deadline = Instant::now()
                            .checked_add(timeout)
                            .map(|deadline| (n, deadline));
                    }
                }
            }
            Err(err) => {
                tracing::warn!("Command #{} ({}) failed: {}", outcome.id, outcome.command.name(), err);
                let message = format!("{} failed: {}", outcome.command.name(), err);
                if let Some(n) = decision_phase {
                    self.approval.rearm(n);
                }
                let phase = decision_phase.or_else(|| self.phases.current_number());
                self.surface(SurfacedErrorKind::CommandFailed, message.clone(), phase);
                self.record(LogLevel::Error, message, phase);
            }
        }
        self.publish();
    }

    /// When the run loop should call [`Self::handle_approval_stall`].
    pub fn stall_deadline(&self) -> Option<Instant> {
        self.stall_deadline.map(|(_, at)| at)
    }

    /// Surfaces a stalled decision and re-arms the gate for a new one.
    pub fn handle_approval_stall(&mut self) {
        let Some((n, _)) = self.stall_deadline.take() else {
            return;
        };
        if !self.approval.rearm(n) {
            return;
        }
        let secs = self.stall_timeout.map(|t| t.as_secs()).unwrap_or_default();
        let message = format!(
            "No response to the decision for phase {} after {}s; decision re-armed",
            n, secs
        );
        tracing::warn!("{}", message);
        self.surface(SurfacedErrorKind::ApprovalStalled, message.clone(), Some(n));
        self.record(LogLevel::Warning, message, Some(n));
        self.publish();
    }

    /// Hands the outcome receiver to an external loop. Afterwards
    /// [`Self::settle`] is a no-op.
    pub fn take_outcomes(&mut self) -> Option<mpsc::UnboundedReceiver<CommandOutcome>> {
        self.outcomes.take()
    }

    /// Waits for every in-flight command and applies its outcome.
    pub async fn settle(&mut self) {
        let Some(mut outcomes) = self.outcomes.take() else {
            return;
        };
        while self.dispatcher.in_flight() > 0 {
            match outcomes.recv().await {
                Some(outcome) => self.handle_command_outcome(outcome),
                None => break,
            }
        }
        self.outcomes = Some(outcomes);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn instance_id(&self) -> &InstanceId {
        self.adapter.instance_id()
    }

    pub fn current_phase(&self) -> Option<&PhaseRecord> {
        self.phases.current()
    }

    pub fn history(&self) -> &[PhaseRecord] {
        self.phases.history().records()
    }

    pub fn log(&self) -> &[LogEntry] {
        self.log.entries()
    }

    pub fn approval(&self) -> Option<&PendingApproval> {
        self.approval.pending()
    }

    pub fn pending_input(&self) -> Option<&PendingInput> {
        self.input.pending()
    }

    pub fn remediation(&self) -> Option<&Remediation> {
        self.remediation.as_ref()
    }

    pub fn errors(&self) -> &[SurfacedError] {
        &self.errors
    }

    pub fn commands_in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let pending_input = self.input.pending().map(|pending| {
            let validation = self.input.validation();
            PendingInputView {
                input: pending.clone(),
                can_submit: matches!(validation, Some(Ok(_))),
                validation_error: validation.and_then(|v| v.err()).map(|e| e.to_string()),
            }
        });
        CoordinatorSnapshot {
            instance_id: self.instance_id().clone(),
            current_phase: self.phases.current().cloned(),
            history: self.history().to_vec(),
            approval: self.approval.pending().cloned(),
            pending_input,
            remediation: self.remediation.clone(),
            errors: self.errors.clone(),
            log_len: self.log.len(),
            commands_in_flight: self.dispatcher.in_flight(),
        }
    }

    /// Ends the run. Aborts the attached subscription and abandons in-flight
    /// commands; nothing new is sent.
    pub fn close(mut self) -> RunReport {
        if let Some(subscription) = self.subscription.take() {
            drop(subscription);
            tracing::debug!("Aborted event subscription");
        }
        if self.dispatcher.in_flight() > 0 {
            tracing::debug!(
                "Closing with {} command(s) in flight",
                self.dispatcher.in_flight()
            );
        }
        RunReport {
            history: self.history().to_vec(),
            log: self.log.entries().to_vec(),
            errors: self.errors,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&mut self, level: LogLevel, message: impl Into<String>, phase: Option<PhaseNumber>) {
        let entry = self.log.append(level, message, phase);
        if let Some(audit) = &self.audit {
            audit.log_entry(entry);
        }
    }

    fn surface(&mut self, kind: SurfacedErrorKind, message: String, phase: Option<PhaseNumber>) {
        self.next_error_id += 1;
        self.errors
            .push(SurfacedError::new(self.next_error_id, kind, message, phase));
    }

    fn publish(&self) {
        // Snapshots are only observable through receivers handed out by `new`.
        if self.snapshot_tx.receiver_count() == 0 {
            return;
        }
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests;
