use super::{CommandError, CommandPort, OutboundCommand};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Result of one outbound command, fed back to the coordinator.
#[derive(Debug)]
pub struct CommandOutcome {
    pub id: u64,
    pub command: OutboundCommand,
    pub result: Result<(), CommandError>,
}

/// Fire-and-forget sender for outbound commands.
pub struct CommandDispatcher {
    port: Arc<dyn CommandPort>,
    outcome_tx: mpsc::UnboundedSender<CommandOutcome>,
    next_id: u64,
    in_flight: usize,
}

impl CommandDispatcher {
    pub fn new(port: Arc<dyn CommandPort>) -> (Self, mpsc::UnboundedReceiver<CommandOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            port,
            outcome_tx,
            next_id: 0,
            in_flight: 0,
        };
        (dispatcher, outcome_rx)
    }

    /// Sends `command` on a new task of the current tokio runtime. Outside a
    /// runtime nothing is sent and the outcome reports [`CommandError::NoRuntime`].
    pub fn dispatch(&mut self, command: OutboundCommand) -> u64 {
        self.next_id += 1;
        self.in_flight += 1;
        let id = self.next_id;

        let Ok(runtime) = Handle::try_current() else {
            // Receiver is gone once the coordinator has closed.
            let _ = self.outcome_tx.send(CommandOutcome {
                id,
                command,
                result: Err(CommandError::NoRuntime),
            });
            return id;
        };

        let port = Arc::clone(&self.port);
        let outcome_tx = self.outcome_tx.clone();
        runtime.spawn(async move {
            let result = port.send(command.clone()).await;
            let _ = outcome_tx.send(CommandOutcome {
                id,
                command,
                result,
            });
        });
        id
    }

    /// Marks one outcome as handled.
    pub fn settled(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
