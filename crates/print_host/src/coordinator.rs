use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::{
    domain::{PrintJob, PrintOutcome},
    error::PrintFailureReason,
    protocol::{SurfaceCommand, SurfaceSignal},
};
use surface_integration::{HostWindow, RenderSurface, SurfaceFactory};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::config::PrintSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("print coordinator is already initialized")]
    AlreadyInitialized,
    #[error("print coordinator is not ready")]
    NotReady,
    #[error("print coordinator was shut down and cannot be reinitialized")]
    Closed,
    #[error("owner window is already destroyed")]
    OwnerDestroyed,
    #[error("failed to create print surface: {0}")]
    SurfaceCreation(String),
    #[error("print queue is full")]
    QueueFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownCause {
    Shutdown,
    OwnerDestroyed,
    SurfaceDestroyed,
}

struct QueuedJob {
    content: String,
    completion: oneshot::Sender<PrintOutcome>,
}

struct CoordinatorState {
    lifecycle: Lifecycle,
    torn_down: bool,
    surface: Option<Arc<dyn RenderSurface>>,
    owner: Option<Arc<dyn HostWindow>>,
    jobs: Option<mpsc::Sender<QueuedJob>>,
    worker: Option<JoinHandle<()>>,
}

struct CoordinatorInner {
    state: Mutex<CoordinatorState>,
}

/// Owns the hidden print surface of one host window.
///
/// Lifecycle is `Uninitialized -> Ready -> Closed`; `Closed` is terminal.
/// Jobs are queued FIFO and rendered one at a time, so a job never overwrites
/// another one still on the surface. Closing the surface, explicitly or
/// because the owner window went away, fails every queued job.
///
/// `initialize` spawns the queue worker and must run inside a tokio runtime.
pub struct PrintCoordinator {
    factory: Arc<dyn SurfaceFactory>,
    settings: PrintSettings,
    inner: Arc<CoordinatorInner>,
}

impl PrintCoordinator {
    pub fn new(factory: Arc<dyn SurfaceFactory>, settings: PrintSettings) -> Self {
        Self {
            factory,
            settings,
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(CoordinatorState {
                    lifecycle: Lifecycle::Uninitialized,
                    torn_down: false,
                    surface: None,
                    owner: None,
                    jobs: None,
                    worker: None,
                }),
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().lifecycle
    }

    pub fn initialize(&self, owner: Arc<dyn HostWindow>) -> Result<(), CoordinatorError> {
        let surface = {
            let mut state = self.inner.lock();
            match state.lifecycle {
                Lifecycle::Ready => {
                    error!("print coordinator initialized twice");
                    return Err(CoordinatorError::AlreadyInitialized);
                }
                Lifecycle::Closed => {
                    error!("print coordinator initialized after shutdown");
                    return Err(CoordinatorError::Closed);
                }
                Lifecycle::Uninitialized => {}
            }
            if owner.is_destroyed() {
                error!(
                    window = owner.label(),
                    "cannot attach print surface to a destroyed window"
                );
                return Err(CoordinatorError::OwnerDestroyed);
            }

            let surface = self.create_surface(&owner)?;
            let (jobs, queue) = mpsc::channel(self.settings.queue_depth.max(1));
            let readiness = Readiness::new(surface.subscribe_signals());
            state.worker = Some(tokio::spawn(drain_jobs(
                Arc::clone(&surface),
                readiness,
                queue,
                self.settings.ready_timeout(),
            )));
            state.jobs = Some(jobs);
            state.surface = Some(Arc::clone(&surface));
            state.owner = Some(Arc::clone(&owner));
            state.lifecycle = Lifecycle::Ready;
            surface
        };

        // Hooks may fire immediately, so they are registered without the lock.
        let weak = Arc::downgrade(&self.inner);
        owner.on_destroyed(teardown_hook(&weak, TeardownCause::OwnerDestroyed));
        surface.on_destroyed(teardown_hook(&weak, TeardownCause::SurfaceDestroyed));

        info!(window = owner.label(), uri = %self.settings.print_page_uri, "print surface ready");
        Ok(())
    }

    fn create_surface(
        &self,
        owner: &Arc<dyn HostWindow>,
    ) -> Result<Arc<dyn RenderSurface>, CoordinatorError> {
        let surface = self.factory.create_surface().map_err(|err| {
            error!("failed to create print surface: {err:#}");
            CoordinatorError::SurfaceCreation(format!("{err:#}"))
        })?;
        surface.set_parent(owner);
        surface.hide();
        if let Err(err) = surface.load_content(&self.settings.print_page_uri) {
            error!(uri = %self.settings.print_page_uri, "failed to load print page: {err:#}");
            surface.destroy();
            return Err(CoordinatorError::SurfaceCreation(format!("{err:#}")));
        }
        if self.settings.debug_surface {
            surface.open_devtools();
        }
        Ok(surface)
    }

    /// Queues `job` and waits for its outcome.
    pub async fn submit(&self, job: PrintJob) -> Result<PrintOutcome, CoordinatorError> {
        let completion = self.enqueue(job)?;
        Ok(completion.await.unwrap_or_else(|_| {
            warn!("print job abandoned by a closing surface");
            PrintOutcome::failed(PrintFailureReason::SurfaceClosed)
        }))
    }

    fn enqueue(&self, job: PrintJob) -> Result<oneshot::Receiver<PrintOutcome>, CoordinatorError> {
        let state = self.inner.lock();
        let jobs = match (state.lifecycle, state.jobs.as_ref()) {
            (Lifecycle::Ready, Some(jobs)) => jobs,
            _ => {
                error!(lifecycle = ?state.lifecycle, "print job submitted while not ready");
                return Err(CoordinatorError::NotReady);
            }
        };
        let (completion, receiver) = oneshot::channel();
        jobs.try_send(QueuedJob {
            content: job.content,
            completion,
        })
        .map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                warn!("print queue is full");
                CoordinatorError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => CoordinatorError::NotReady,
        })?;
        debug!("print job queued");
        Ok(receiver)
    }

    /// Destroys the surface and closes the coordinator. Safe to call any
    /// number of times.
    pub fn shutdown(&self) {
        self.inner.teardown(TeardownCause::Shutdown);
    }
}

impl Drop for PrintCoordinator {
    fn drop(&mut self) {
        self.inner.teardown(TeardownCause::Shutdown);
    }
}

impl CoordinatorInner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single teardown path behind shutdown and both destroy hooks.
    fn teardown(&self, cause: TeardownCause) {
        let (surface, worker, owner) = {
            let mut state = self.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            let was = state.lifecycle;
            state.lifecycle = Lifecycle::Closed;
            state.jobs = None;
            if was == Lifecycle::Uninitialized {
                debug!(?cause, "print coordinator closed before initialization");
            }
            (state.surface.take(), state.worker.take(), state.owner.take())
        };

        // Dropping the worker drops every queued completion sender.
        if let Some(worker) = worker {
            worker.abort();
        }
        if let Some(surface) = surface {
            surface.destroy();
        }
        info!(
            ?cause,
            window = owner.as_ref().map(|owner| owner.label()),
            "print surface closed"
        );
    }
}

fn teardown_hook(
    inner: &Weak<CoordinatorInner>,
    cause: TeardownCause,
) -> surface_integration::DestroyHook {
    let inner = Weak::clone(inner);
    Box::new(move || {
        if let Some(inner) = inner.upgrade() {
            inner.teardown(cause);
        }
    })
}

async fn drain_jobs(
    surface: Arc<dyn RenderSurface>,
    mut readiness: Readiness,
    mut queue: mpsc::Receiver<QueuedJob>,
    ready_timeout: Duration,
) {
    while let Some(job) = queue.recv().await {
        let outcome = run_job(surface.as_ref(), &mut readiness, job.content, ready_timeout).await;
        if !outcome.success {
            warn!(reason = ?outcome.reason, "print job failed");
        }
        let _ = job.completion.send(outcome);
    }
}

async fn run_job(
    surface: &dyn RenderSurface,
    readiness: &mut Readiness,
    content: String,
    ready_timeout: Duration,
) -> PrintOutcome {
    if let Err(err) = surface.send(SurfaceCommand::PrintJob { content }) {
        warn!("print surface rejected job: {err:#}");
        return PrintOutcome::failed(PrintFailureReason::SurfaceUnavailable);
    }

    match tokio::time::timeout(ready_timeout, readiness.next_ready()).await {
        Ok(true) => {}
        Ok(false) => return PrintOutcome::failed(PrintFailureReason::SurfaceClosed),
        Err(_) => {
            // The surface still owes a signal for this job.
            readiness.owed += 1;
            return PrintOutcome::failed(PrintFailureReason::SurfaceTimeout);
        }
    }

    if surface.print().await {
        debug!("print job written");
        PrintOutcome::printed()
    } else {
        PrintOutcome::failed(PrintFailureReason::PlatformRejected)
    }
}

/// Readiness signals for the worker's lifetime.
///
/// The receiver is subscribed before the first job is sent, so every signal
/// the surface emits is seen in order. Signals carry no job identity: one
/// owed by a job that timed out is discarded before the current job's own
/// signal is accepted.
struct Readiness {
    signals: broadcast::Receiver<SurfaceSignal>,
    owed: usize,
}

impl Readiness {
    fn new(signals: broadcast::Receiver<SurfaceSignal>) -> Self {
        Self { signals, owed: 0 }
    }

    /// True once the current job's signal arrives, false if the surface is
    /// gone. Cancel safe: `owed` is updated as signals are consumed.
    async fn next_ready(&mut self) -> bool {
        loop {
            match self.signals.recv().await {
                Ok(SurfaceSignal::ReadyToPrintJob) => {
                    if self.owed == 0 {
                        return true;
                    }
                    self.owed -= 1;
                    debug!(still_owed = self.owed, "discarding late readiness signal");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    let skipped = usize::try_from(skipped).unwrap_or(usize::MAX);
                    // Every skipped message was a readiness signal.
                    if skipped > self.owed {
                        self.owed = 0;
                        return true;
                    }
                    self.owed -= skipped;
                }
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
