//! Host side of the requester protocol: `print_job` in, `wrote_job` out.
//!
//! Each requester channel is served sequentially, so completions go back in
//! the order the jobs arrived on that channel.

use std::sync::Arc;

use anyhow::Context;
use shared::{
    domain::{PrintJob, PrintOutcome},
    error::PrintFailureReason,
    protocol::{from_wire_line, to_wire_line, HostMessage, RequesterMessage},
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::coordinator::{CoordinatorError, Lifecycle, PrintCoordinator};

async fn handle_request(coordinator: &PrintCoordinator, request: RequesterMessage) -> HostMessage {
    match request {
        RequesterMessage::PrintJob { content } => {
            debug!(bytes = content.len(), "print job received");
            let outcome = match coordinator.submit(PrintJob { content }).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("print job rejected by coordinator: {err}");
                    PrintOutcome::failed(failure_reason(coordinator, &err))
                }
            };
            HostMessage::from(outcome)
        }
    }
}

fn failure_reason(coordinator: &PrintCoordinator, err: &CoordinatorError) -> PrintFailureReason {
    match err {
        CoordinatorError::QueueFull => PrintFailureReason::SurfaceUnavailable,
        // The host is alive but its surface was torn down.
        CoordinatorError::NotReady if coordinator.lifecycle() == Lifecycle::Closed => {
            PrintFailureReason::SurfaceClosed
        }
        _ => PrintFailureReason::HostUnavailable,
    }
}

/// Serves one in-process requester channel until it closes.
pub fn serve_requester(
    coordinator: Arc<PrintCoordinator>,
    mut requests: mpsc::UnboundedReceiver<RequesterMessage>,
    events: mpsc::UnboundedSender<HostMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let reply = handle_request(&coordinator, request).await;
            if events.send(reply).is_err() {
                warn!("requester went away before its completion was delivered");
                break;
            }
        }
        debug!("requester channel closed");
    })
}

/// Serves the protocol over a newline-delimited JSON stream until EOF.
/// Lines that do not parse are logged and skipped.
pub async fn serve_json_lines<R, W>(
    coordinator: Arc<PrintCoordinator>,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read requester stream")?
    {
        if line.trim().is_empty() {
            continue;
        }
        let request = match from_wire_line::<RequesterMessage>(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!("skipping malformed requester message: {err}");
                continue;
            }
        };
        let reply = handle_request(&coordinator, request).await;
        let mut encoded = to_wire_line(&reply).context("failed to encode completion")?;
        encoded.push('\n');
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write completion")?;
        writer.flush().await.context("failed to flush completion")?;
    }
    info!("requester stream closed");
    Ok(())
}

#[cfg(test)]
#[path = "tests/ipc_tests.rs"]
mod tests;
