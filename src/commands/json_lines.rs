use super::{CommandError, CommandPort, OutboundCommand};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each command as one JSON line to an async writer.
pub struct JsonLinesPort<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> CommandPort for JsonLinesPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, command: OutboundCommand) -> Result<(), CommandError> {
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}
