//! Single-consumer run loop.
//!
//! Backend events, operator actions, command outcomes and the approval
//! stall timer are all processed here, one at a time, against one
//! [`WorkflowCoordinator`].

use super::WorkflowCoordinator;
use crate::domain::{CoordinatorError, InputAnswer, LogEntry, PhaseRecord, RequestId, SurfacedError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

type Reply = oneshot::Sender<Result<(), CoordinatorError>>;

/// Messages from the operator side.
pub enum OperatorAction {
    Approve(Reply),
    Reject { reason: String, reply: Reply },
    EditOutput { text: String, reply: Reply },
    SetAnswer { answer: InputAnswer, reply: Reply },
    SubmitInput { request_id: RequestId, reply: Reply },
    CancelInput { request_id: RequestId, reply: Reply },
    DismissError(u64),
    DismissRemediation,
    /// Ends the loop without sending anything further.
    Close,
}

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub history: Vec<PhaseRecord>,
    pub log: Vec<LogEntry>,
    pub errors: Vec<SurfacedError>,
}

/// Drives `coordinator` until a `Close` action arrives or every
/// [`OperatorHandle`] is dropped. The loop keeps serving operator actions
/// after the event stream ends.
pub async fn run(
    mut coordinator: WorkflowCoordinator,
    mut events: mpsc::Receiver<Value>,
    mut actions: mpsc::Receiver<OperatorAction>,
) -> RunReport {
    let mut outcomes = coordinator.take_outcomes();
    let mut events_open = true;

    loop {
        let stall = coordinator.stall_deadline();
        let stall_at = stall.unwrap_or_else(Instant::now);

        tokio::select! {
            raw = events.recv(), if events_open => match raw {
                Some(raw) => coordinator.handle_raw(&raw),
                None => {
                    tracing::debug!("Backend event stream closed");
                    events_open = false;
                }
            },
            Some(outcome) = next_outcome(&mut outcomes) => {
                coordinator.handle_command_outcome(outcome);
            }
            action = actions.recv() => match action {
                Some(OperatorAction::Close) | None => break,
                Some(action) => apply(&mut coordinator, action),
            },
            _ = tokio::time::sleep_until(stall_at), if stall.is_some() => {
                coordinator.handle_approval_stall();
            }
        }
    }

    coordinator.close()
}

async fn next_outcome<T>(outcomes: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match outcomes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn apply(coordinator: &mut WorkflowCoordinator, action: OperatorAction) {
    // A dropped reply receiver means the caller stopped waiting; the action still applies.
    match action {
        OperatorAction::Approve(reply) => {
            let _ = reply.send(coordinator.approve());
        }
        OperatorAction::Reject { reason, reply } => {
            let _ = reply.send(coordinator.reject(&reason));
        }
        OperatorAction::EditOutput { text, reply } => {
            let _ = reply.send(coordinator.edit_approval_output(text));
        }
        OperatorAction::SetAnswer { answer, reply } => {
            let _ = reply.send(coordinator.set_input_answer(answer));
        }
        OperatorAction::SubmitInput { request_id, reply } => {
            let _ = reply.send(coordinator.submit_input(&request_id));
        }
        OperatorAction::CancelInput { request_id, reply } => {
            let _ = reply.send(coordinator.cancel_input(&request_id));
        }
        OperatorAction::DismissError(id) => {
            coordinator.dismiss_error(id);
        }
        OperatorAction::DismissRemediation => {
            coordinator.dismiss_remediation();
        }
        OperatorAction::Close => {}
    }
}

/// Cloneable sender for operator actions.
#[derive(Clone)]
pub struct OperatorHandle {
    tx: mpsc::Sender<OperatorAction>,
}

impl OperatorHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OperatorAction>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    async fn request(
        &self,
        build: impl FnOnce(Reply) -> OperatorAction,
    ) -> Result<(), CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CoordinatorError::Closed)?;
        response.await.map_err(|_| CoordinatorError::Closed)?
    }

    pub async fn approve(&self) -> Result<(), CoordinatorError> {
        self.request(OperatorAction::Approve).await
    }

    pub async fn reject(&self, reason: impl Into<String>) -> Result<(), CoordinatorError> {
        let reason = reason.into();
        self.request(|reply| OperatorAction::Reject { reason, reply })
            .await
    }

    pub async fn edit_output(&self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        let text = text.into();
        self.request(|reply| OperatorAction::EditOutput { text, reply })
            .await
    }

    pub async fn set_answer(&self, answer: InputAnswer) -> Result<(), CoordinatorError> {
        self.request(|reply| OperatorAction::SetAnswer { answer, reply })
            .await
    }

    pub async fn submit_input(&self, request_id: RequestId) -> Result<(), CoordinatorError> {
        self.request(|reply| OperatorAction::SubmitInput { request_id, reply })
            .await
    }

    pub async fn cancel_input(&self, request_id: RequestId) -> Result<(), CoordinatorError> {
        self.request(|reply| OperatorAction::CancelInput { request_id, reply })
            .await
    }

    pub async fn dismiss_error(&self, id: u64) -> Result<(), CoordinatorError> {
        self.tx
            .send(OperatorAction::DismissError(id))
            .await
            .map_err(|_| CoordinatorError::Closed)
    }

    pub async fn dismiss_remediation(&self) -> Result<(), CoordinatorError> {
        self.tx
            .send(OperatorAction::DismissRemediation)
            .await
            .map_err(|_| CoordinatorError::Closed)
    }

    pub async fn close(&self) -> Result<(), CoordinatorError> {
        self.tx
            .send(OperatorAction::Close)
            .await
            .map_err(|_| CoordinatorError::Closed)
    }
}
