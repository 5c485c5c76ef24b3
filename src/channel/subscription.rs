//! Background forwarding of a backend event stream.
//!
//! `EventSubscription` drains any `Stream` of raw JSON events into a bounded
//! channel consumed by the coordinator. Dropping the subscription aborts the
//! forwarding task.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct EventSubscription {
    task: JoinHandle<()>,
}

impl EventSubscription {
    /// Spawns a task forwarding `stream` into `tx` until either side closes.
    pub fn spawn<S>(stream: S, tx: mpsc::Sender<Value>) -> Self
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(raw) = stream.next().await {
                if tx.send(raw).await.is_err() {
                    break; // Coordinator gone
                }
            }
            tracing::debug!("Event stream ended");
        });
        Self { task }
    }

    /// Convenience for `spawn` with a fresh channel of `capacity`.
    pub fn channel<S>(stream: S, capacity: usize) -> (Self, mpsc::Receiver<Value>)
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::spawn(stream, tx), rx)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reads newline-delimited JSON events. Blank lines are skipped and
/// unparseable lines are logged and skipped; a read error ends the stream.
pub fn json_lines<R>(reader: R) -> impl Stream<Item = Value> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    futures::stream::unfold(reader.lines(), |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(raw) => return Some((raw, lines)),
                        Err(e) => tracing::warn!("Skipping unparseable event line: {}", e),
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!("Event stream read failed: {}", e);
                    return None;
                }
            }
        }
    })
}
