use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::{
    domain::PrintOutcome,
    error::PrintFailureReason,
    protocol::{HostMessage, RequesterMessage},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{clipboard::ClipboardProvider, error::BridgeError};

pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// One entry per job sent, in send order. Fire-and-forget jobs hold `None`.
type PendingCompletions = Arc<Mutex<VecDeque<Option<oneshot::Sender<PrintOutcome>>>>>;

/// Requester-side handle to the print host and the system clipboard.
///
/// The host replies to every `print_job` with one `wrote_job` on an ordered
/// channel, so completions are matched to requests first-in first-out and no
/// request id travels on the wire.
pub struct PrintBridge {
    requests: mpsc::UnboundedSender<RequesterMessage>,
    pending: PendingCompletions,
    completions: broadcast::Sender<PrintOutcome>,
    clipboard: Arc<dyn ClipboardProvider>,
    completion_timeout: Duration,
    completion_task: JoinHandle<()>,
}

impl PrintBridge {
    /// Must be called inside a tokio runtime; spawns the completion reader.
    pub fn connect(
        requests: mpsc::UnboundedSender<RequesterMessage>,
        events: mpsc::UnboundedReceiver<HostMessage>,
        clipboard: Arc<dyn ClipboardProvider>,
    ) -> Self {
        let pending = PendingCompletions::default();
        let (completions, _) = broadcast::channel(64);
        let completion_task = tokio::spawn(read_completions(
            events,
            Arc::clone(&pending),
            completions.clone(),
        ));
        Self {
            requests,
            pending,
            completions,
            clipboard,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            completion_task,
        }
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Sends a print job without waiting for it.
    pub fn request_print(&self, text: &str) -> Result<(), BridgeError> {
        self.send_job(text, None)
    }

    /// Sends a print job and resolves with its completion.
    pub async fn print(&self, text: &str) -> Result<PrintOutcome, BridgeError> {
        let (completion, receiver) = oneshot::channel();
        self.send_job(text, Some(completion))?;
        match tokio::time::timeout(self.completion_timeout, receiver).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => {
                warn!("print host went away before completing the job");
                Ok(PrintOutcome::failed(PrintFailureReason::HostUnavailable))
            }
            Err(_) => Err(BridgeError::CompletionTimedOut(self.completion_timeout)),
        }
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<PrintOutcome> {
        self.completions.subscribe()
    }

    pub fn request_copy_to_clipboard(&self, text: &str) -> Result<(), BridgeError> {
        self.clipboard.write_text(text)?;
        Ok(())
    }

    /// Current clipboard text, or an empty string when there is none.
    pub fn request_read_clipboard(&self) -> String {
        match self.clipboard.read_text() {
            Ok(text) => text.unwrap_or_default(),
            Err(err) => {
                debug!("clipboard read failed: {err}");
                String::new()
            }
        }
    }

    fn send_job(
        &self,
        text: &str,
        completion: Option<oneshot::Sender<PrintOutcome>>,
    ) -> Result<(), BridgeError> {
        // Queue slot and send happen under one lock to keep them in the same order.
        let mut pending = lock_pending(&self.pending);
        if self.completion_task.is_finished() {
            return Err(BridgeError::HostDisconnected);
        }
        self.requests
            .send(RequesterMessage::PrintJob {
                content: text.to_string(),
            })
            .map_err(|_| BridgeError::HostDisconnected)?;
        pending.push_back(completion);
        debug!(in_flight = pending.len(), "print job sent");
        Ok(())
    }
}

impl Drop for PrintBridge {
    fn drop(&mut self) {
        self.completion_task.abort();
    }
}

fn lock_pending(
    pending: &PendingCompletions,
) -> MutexGuard<'_, VecDeque<Option<oneshot::Sender<PrintOutcome>>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_completions(
    mut events: mpsc::UnboundedReceiver<HostMessage>,
    pending: PendingCompletions,
    completions: broadcast::Sender<PrintOutcome>,
) {
    while let Some(event) = events.recv().await {
        let outcome = PrintOutcome::from(event);
        match lock_pending(&pending).pop_front() {
            Some(Some(waiter)) => {
                let _ = waiter.send(outcome);
            }
            Some(None) => {}
            None => warn!("completion received with no job in flight"),
        }
        let _ = completions.send(outcome);
    }
    // Dropping the waiters resolves them as host-unavailable.
    lock_pending(&pending).clear();
    debug!("print host channel closed");
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
