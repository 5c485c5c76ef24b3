use super::*;
use crate::test_support::{FailingPort, RecordingPort};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_wire_format() {
    let approve = OutboundCommand::ApprovePhase {
        instance_id: InstanceId::from("instance-1"),
        phase_number: PhaseNumber(3),
        output: "Draft v2".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&approve).unwrap(),
        json!({"command": "approve-phase", "instanceId": "instance-1", "phaseNumber": 3, "output": "Draft v2"})
    );

    let input = OutboundCommand::SendUserInput {
        request_id: RequestId::from("r1"),
        value: InputAnswer::Number(4.0),
    };
    assert_eq!(
        serde_json::to_value(&input).unwrap(),
        json!({"command": "send-user-input", "requestId": "r1", "value": 4.0})
    );
}

#[test]
fn test_decision_phase() {
    let reject = OutboundCommand::RejectPhase {
        instance_id: InstanceId::from("instance-1"),
        phase_number: PhaseNumber(2),
        reason: "no".to_string(),
    };
    assert_eq!(reject.decision_phase(), Some(PhaseNumber(2)));
    assert_eq!(reject.name(), "reject-phase");

    let input = OutboundCommand::SendUserInput {
        request_id: RequestId::from("r1"),
        value: InputAnswer::from("x"),
    };
    assert_eq!(input.decision_phase(), None);
}

#[tokio::test]
async fn test_json_lines_port_writes_one_line_per_command() {
    let port = JsonLinesPort::new(Vec::new());
    for n in 1..=2 {
        port.send(OutboundCommand::RejectPhase {
            instance_id: InstanceId::from("instance-1"),
            phase_number: PhaseNumber(n),
            reason: "again".to_string(),
        })
        .await
        .unwrap();
    }

    let written = String::from_utf8(port.into_inner()).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    let second: OutboundCommand = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second.decision_phase(), Some(PhaseNumber(2)));
}

#[tokio::test]
async fn test_dispatcher_reports_outcomes() {
    let port = RecordingPort::default();
    let (mut dispatcher, mut outcomes) = CommandDispatcher::new(Arc::new(port.clone()));

    let id = dispatcher.dispatch(OutboundCommand::SendUserInput {
        request_id: RequestId::from("r1"),
        value: InputAnswer::from("Dune"),
    });
    assert_eq!(dispatcher.in_flight(), 1);

    let outcome = outcomes.recv().await.unwrap();
    dispatcher.settled();
    assert_eq!(outcome.id, id);
    assert!(outcome.result.is_ok());
    assert_eq!(dispatcher.in_flight(), 0);
    assert_eq!(port.sent().len(), 1);
}

#[tokio::test]
async fn test_dispatcher_surfaces_port_failure() {
    let (mut dispatcher, mut outcomes) = CommandDispatcher::new(Arc::new(FailingPort));
    dispatcher.dispatch(OutboundCommand::RejectPhase {
        instance_id: InstanceId::from("instance-1"),
        phase_number: PhaseNumber(1),
        reason: "bad".to_string(),
    });

    let outcome = outcomes.recv().await.unwrap();
    match outcome.result {
        Err(CommandError::Rejected { command, .. }) => assert_eq!(command, "reject-phase"),
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[test]
fn test_dispatch_outside_runtime_reports_failure() {
    let port = RecordingPort::default();
    let (mut dispatcher, mut outcomes) = CommandDispatcher::new(Arc::new(port.clone()));
    let id = dispatcher.dispatch(OutboundCommand::SendUserInput {
        request_id: RequestId::from("r1"),
        value: InputAnswer::from("x"),
    });

    let outcome = outcomes.try_recv().unwrap();
    assert_eq!(outcome.id, id);
    assert!(matches!(outcome.result, Err(CommandError::NoRuntime)));
    assert_eq!(dispatcher.in_flight(), 1);
    assert!(port.sent().is_empty());
}
