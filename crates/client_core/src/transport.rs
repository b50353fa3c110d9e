//! Requester transport over a newline-delimited JSON stream, e.g. the stdin
//! and stdout of a spawned print host process.

use anyhow::Context;
use shared::protocol::{from_wire_line, to_wire_line, HostMessage, RequesterMessage};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, warn};

/// Spawns a writer and a reader task and returns the channel ends a
/// [`crate::PrintBridge`] connects to. The reader ends at EOF, which closes
/// the completion channel.
pub fn connect_json_lines<R, W>(
    reader: R,
    writer: W,
) -> (
    mpsc::UnboundedSender<RequesterMessage>,
    mpsc::UnboundedReceiver<HostMessage>,
)
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(err) = write_requests(request_rx, writer).await {
            warn!("print host stream write failed: {err:#}");
        }
    });
    tokio::spawn(async move {
        if let Err(err) = read_events(reader, event_tx).await {
            warn!("print host stream read failed: {err:#}");
        }
    });

    (request_tx, event_rx)
}

async fn write_requests<W>(
    mut requests: mpsc::UnboundedReceiver<RequesterMessage>,
    mut writer: W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(request) = requests.recv().await {
        let mut line = to_wire_line(&request).context("failed to encode print request")?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("failed to write print request")?;
        writer.flush().await.context("failed to flush print request")?;
    }
    writer.shutdown().await.context("failed to close request stream")?;
    Ok(())
}

async fn read_events<R>(reader: R, events: mpsc::UnboundedSender<HostMessage>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read host stream")?
    {
        if line.trim().is_empty() {
            continue;
        }
        match from_wire_line::<HostMessage>(&line) {
            Ok(event) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(err) => warn!("skipping malformed host message: {err}"),
        }
    }
    debug!("print host stream ended");
    Ok(())
}
