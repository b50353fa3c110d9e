use super::*;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use surface_integration::{
    DestroyHook, DestroyHooks, HeadlessSurfaceFactory, HeadlessWindow, PrintSpool,
};
use tokio::sync::Semaphore;

struct ScriptedSurface {
    hooks: DestroyHooks,
    signals: broadcast::Sender<SurfaceSignal>,
    signal_ready: bool,
    print_result: bool,
    fail_load: bool,
    print_gate: Option<Arc<Semaphore>>,
    rendered: Mutex<Option<String>>,
    deliveries: Mutex<Vec<String>>,
    printed: Mutex<Vec<String>>,
    devtools_opened: AtomicBool,
    hidden: AtomicBool,
}

impl ScriptedSurface {
    fn ready() -> Self {
        let (signals, _) = broadcast::channel(8);
        Self {
            hooks: DestroyHooks::default(),
            signals,
            signal_ready: true,
            print_result: true,
            fail_load: false,
            print_gate: None,
            rendered: Mutex::new(None),
            deliveries: Mutex::new(Vec::new()),
            printed: Mutex::new(Vec::new()),
            devtools_opened: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
        }
    }

    fn never_ready() -> Self {
        Self {
            signal_ready: false,
            ..Self::ready()
        }
    }

    fn rejecting_print() -> Self {
        Self {
            print_result: false,
            ..Self::ready()
        }
    }

    fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::ready()
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            print_gate: Some(gate),
            ..Self::ready()
        }
    }

    fn deliveries(&self) -> Vec<String> {
        self.deliveries.lock().expect("deliveries").clone()
    }

    fn printed(&self) -> Vec<String> {
        self.printed.lock().expect("printed").clone()
    }
}

#[async_trait]
impl RenderSurface for ScriptedSurface {
    fn set_parent(&self, _owner: &Arc<dyn HostWindow>) {}

    fn hide(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }

    fn load_content(&self, uri: &str) -> anyhow::Result<()> {
        if self.fail_load {
            return Err(anyhow::anyhow!("cannot load {uri}"));
        }
        Ok(())
    }

    fn send(&self, command: SurfaceCommand) -> anyhow::Result<()> {
        let SurfaceCommand::PrintJob { content } = command;
        self.deliveries
            .lock()
            .expect("deliveries")
            .push(content.clone());
        *self.rendered.lock().expect("rendered") = Some(content);
        if self.signal_ready {
            let _ = self.signals.send(SurfaceSignal::ReadyToPrintJob);
        }
        Ok(())
    }

    fn subscribe_signals(&self) -> broadcast::Receiver<SurfaceSignal> {
        self.signals.subscribe()
    }

    async fn print(&self) -> bool {
        if let Some(gate) = &self.print_gate {
            gate.acquire().await.expect("gate").forget();
        }
        let rendered = self.rendered.lock().expect("rendered").clone();
        if let Some(rendered) = rendered {
            self.printed.lock().expect("printed").push(rendered);
        }
        self.print_result
    }

    fn open_devtools(&self) {
        self.devtools_opened.store(true, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.hooks.fire();
    }

    fn is_destroyed(&self) -> bool {
        self.hooks.is_destroyed()
    }

    fn on_destroyed(&self, hook: DestroyHook) {
        self.hooks.register(hook);
    }
}

struct ScriptedFactory {
    surface: Arc<dyn RenderSurface>,
}

impl SurfaceFactory for ScriptedFactory {
    fn create_surface(&self) -> anyhow::Result<Arc<dyn RenderSurface>> {
        Ok(Arc::clone(&self.surface))
    }
}

struct FailingFactory;

impl SurfaceFactory for FailingFactory {
    fn create_surface(&self) -> anyhow::Result<Arc<dyn RenderSurface>> {
        Err(anyhow::anyhow!("no display"))
    }
}

fn settings() -> PrintSettings {
    PrintSettings {
        print_page_uri: "file:///app/print.html".to_string(),
        ready_timeout_ms: 200,
        queue_depth: 4,
        debug_surface: false,
    }
}

fn scripted(surface: ScriptedSurface) -> (Arc<PrintCoordinator>, Arc<ScriptedSurface>) {
    scripted_with(surface, settings())
}

fn scripted_with(
    surface: ScriptedSurface,
    settings: PrintSettings,
) -> (Arc<PrintCoordinator>, Arc<ScriptedSurface>) {
    let surface = Arc::new(surface);
    let coordinator = coordinator_for(Arc::clone(&surface) as Arc<dyn RenderSurface>, settings);
    (coordinator, surface)
}

fn coordinator_for(
    surface: Arc<dyn RenderSurface>,
    settings: PrintSettings,
) -> Arc<PrintCoordinator> {
    let factory = Arc::new(ScriptedFactory { surface });
    Arc::new(PrintCoordinator::new(factory, settings))
}

/// Renders each delivery after its own delay, then signals readiness, the
/// way a page does when layout is slow.
struct DelayedSurface {
    hooks: DestroyHooks,
    signals: broadcast::Sender<SurfaceSignal>,
    delays: Mutex<Vec<Duration>>,
    rendered: Arc<Mutex<Option<String>>>,
    printed: Mutex<Vec<String>>,
}

impl DelayedSurface {
    fn new(delays: Vec<Duration>) -> Self {
        let (signals, _) = broadcast::channel(8);
        Self {
            hooks: DestroyHooks::default(),
            signals,
            delays: Mutex::new(delays.into_iter().rev().collect()),
            rendered: Arc::new(Mutex::new(None)),
            printed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RenderSurface for DelayedSurface {
    fn set_parent(&self, _owner: &Arc<dyn HostWindow>) {}

    fn hide(&self) {}

    fn load_content(&self, _uri: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn send(&self, command: SurfaceCommand) -> anyhow::Result<()> {
        let SurfaceCommand::PrintJob { content } = command;
        let delay = self
            .delays
            .lock()
            .expect("delays")
            .pop()
            .unwrap_or_default();
        let rendered = Arc::clone(&self.rendered);
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            *rendered.lock().expect("rendered") = Some(content);
            let _ = signals.send(SurfaceSignal::ReadyToPrintJob);
        });
        Ok(())
    }

    fn subscribe_signals(&self) -> broadcast::Receiver<SurfaceSignal> {
        self.signals.subscribe()
    }

    async fn print(&self) -> bool {
        let rendered = self.rendered.lock().expect("rendered").clone();
        if let Some(rendered) = rendered {
            self.printed.lock().expect("printed").push(rendered);
        }
        true
    }

    fn destroy(&self) {
        self.hooks.fire();
    }

    fn is_destroyed(&self) -> bool {
        self.hooks.is_destroyed()
    }

    fn on_destroyed(&self, hook: DestroyHook) {
        self.hooks.register(hook);
    }
}

fn window() -> Arc<HeadlessWindow> {
    HeadlessWindow::new("main")
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn submit_before_initialize_is_not_ready() {
    let (coordinator, _) = scripted(ScriptedSurface::ready());

    assert_eq!(coordinator.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(
        coordinator.submit(PrintJob::new("1. apple\n")).await,
        Err(CoordinatorError::NotReady)
    );
}

#[tokio::test]
async fn initialize_attaches_hidden_surface_with_print_page() {
    let factory = Arc::new(HeadlessSurfaceFactory::new(PrintSpool::in_memory()));
    let coordinator = PrintCoordinator::new(factory.clone(), settings());

    coordinator.initialize(window()).expect("initialize");

    let created = factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_hidden());
    assert_eq!(created[0].parent_label().as_deref(), Some("main"));
    assert_eq!(
        created[0].loaded_uri().as_deref(),
        Some("file:///app/print.html")
    );
    assert_eq!(coordinator.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn prints_through_headless_surface() {
    let factory = Arc::new(HeadlessSurfaceFactory::new(PrintSpool::in_memory()));
    let coordinator = PrintCoordinator::new(factory.clone(), settings());
    coordinator.initialize(window()).expect("initialize");

    let outcome = coordinator
        .submit(PrintJob::new("1. apple\n2. banana\n"))
        .await
        .expect("submit");

    assert_eq!(outcome, PrintOutcome::printed());
    assert_eq!(
        factory.spool().documents(),
        vec!["1. apple\n2. banana\n".to_string()]
    );
}

#[tokio::test]
async fn second_initialize_is_refused() {
    let (coordinator, _) = scripted(ScriptedSurface::ready());
    coordinator.initialize(window()).expect("initialize");

    assert_eq!(
        coordinator.initialize(window()),
        Err(CoordinatorError::AlreadyInitialized)
    );
    assert_eq!(coordinator.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn shutdown_is_idempotent_and_terminal() {
    let (coordinator, surface) = scripted(ScriptedSurface::ready());
    coordinator.initialize(window()).expect("initialize");

    coordinator.shutdown();
    coordinator.shutdown();

    assert!(surface.is_destroyed());
    assert_eq!(coordinator.lifecycle(), Lifecycle::Closed);
    assert_eq!(
        coordinator.submit(PrintJob::new("1. apple\n")).await,
        Err(CoordinatorError::NotReady)
    );
    assert_eq!(coordinator.initialize(window()), Err(CoordinatorError::Closed));
}

#[tokio::test]
async fn platform_failure_is_reported_as_unsuccessful() {
    let (coordinator, _) = scripted(ScriptedSurface::rejecting_print());
    coordinator.initialize(window()).expect("initialize");

    let outcome = coordinator
        .submit(PrintJob::new("1. apple\n"))
        .await
        .expect("submit");

    assert_eq!(
        outcome,
        PrintOutcome::failed(PrintFailureReason::PlatformRejected)
    );
    assert_eq!(coordinator.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn surface_that_never_signals_ready_times_out() {
    let (coordinator, surface) = scripted(ScriptedSurface::never_ready());
    coordinator.initialize(window()).expect("initialize");

    let outcome = coordinator
        .submit(PrintJob::new("1. apple\n"))
        .await
        .expect("submit");

    assert_eq!(outcome, PrintOutcome::failed(PrintFailureReason::SurfaceTimeout));
    assert!(surface.printed().is_empty());
}

#[tokio::test]
async fn queued_jobs_print_one_at_a_time_in_order() {
    let gate = Arc::new(Semaphore::new(0));
    let (coordinator, surface) = scripted(ScriptedSurface::gated(Arc::clone(&gate)));
    coordinator.initialize(window()).expect("initialize");

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. first\n")).await })
    };
    wait_for(|| surface.deliveries().len() == 1).await;

    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. second\n")).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(surface.deliveries(), vec!["1. first\n".to_string()]);

    gate.add_permits(2);

    assert!(first.await.expect("join").expect("first").success);
    assert!(second.await.expect("join").expect("second").success);
    assert_eq!(
        surface.printed(),
        vec!["1. first\n".to_string(), "1. second\n".to_string()]
    );
}

#[tokio::test]
async fn full_queue_rejects_further_jobs() {
    let gate = Arc::new(Semaphore::new(0));
    let mut limited = settings();
    limited.queue_depth = 1;
    let (coordinator, surface) = scripted_with(ScriptedSurface::gated(Arc::clone(&gate)), limited);
    coordinator.initialize(window()).expect("initialize");

    let _in_flight = coordinator.enqueue(PrintJob::new("1. a\n")).expect("first");
    wait_for(|| surface.deliveries().len() == 1).await;
    let _queued = coordinator.enqueue(PrintJob::new("1. b\n")).expect("second");

    assert!(matches!(
        coordinator.enqueue(PrintJob::new("1. c\n")),
        Err(CoordinatorError::QueueFull)
    ));
}

#[tokio::test]
async fn owner_destroyed_mid_job_fails_pending_jobs_and_closes() {
    let gate = Arc::new(Semaphore::new(0));
    let (coordinator, surface) = scripted(ScriptedSurface::gated(gate));
    let owner = window();
    coordinator.initialize(owner.clone()).expect("initialize");

    let in_flight = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. a\n")).await })
    };
    wait_for(|| surface.deliveries().len() == 1).await;
    let queued = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. b\n")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    owner.destroy();

    let failed = PrintOutcome::failed(PrintFailureReason::SurfaceClosed);
    assert_eq!(in_flight.await.expect("join"), Ok(failed));
    assert_eq!(queued.await.expect("join"), Ok(failed));
    assert!(surface.is_destroyed());
    assert_eq!(coordinator.lifecycle(), Lifecycle::Closed);
    coordinator.shutdown();
}

#[tokio::test]
async fn destroying_the_surface_directly_closes_the_coordinator() {
    let (coordinator, surface) = scripted(ScriptedSurface::ready());
    coordinator.initialize(window()).expect("initialize");

    surface.destroy();

    assert_eq!(coordinator.lifecycle(), Lifecycle::Closed);
    assert_eq!(
        coordinator.submit(PrintJob::new("1. apple\n")).await,
        Err(CoordinatorError::NotReady)
    );
    coordinator.shutdown();
}

#[tokio::test]
async fn destroyed_owner_is_refused() {
    let (coordinator, _) = scripted(ScriptedSurface::ready());
    let owner = window();
    owner.destroy();

    assert_eq!(
        coordinator.initialize(owner),
        Err(CoordinatorError::OwnerDestroyed)
    );
    assert_eq!(coordinator.lifecycle(), Lifecycle::Uninitialized);
}

#[tokio::test]
async fn surface_creation_failures_leave_coordinator_uninitialized() {
    let coordinator = PrintCoordinator::new(Arc::new(FailingFactory), settings());
    assert!(matches!(
        coordinator.initialize(window()),
        Err(CoordinatorError::SurfaceCreation(_))
    ));
    assert_eq!(coordinator.lifecycle(), Lifecycle::Uninitialized);

    let (coordinator, surface) = scripted(ScriptedSurface::failing_load());
    assert!(matches!(
        coordinator.initialize(window()),
        Err(CoordinatorError::SurfaceCreation(_))
    ));
    assert!(surface.is_destroyed());
}

#[tokio::test]
async fn debug_settings_open_devtools_on_hidden_surface() {
    let mut debug = settings();
    debug.debug_surface = true;
    let (coordinator, surface) = scripted_with(ScriptedSurface::ready(), debug);

    coordinator.initialize(window()).expect("initialize");

    assert!(surface.devtools_opened.load(Ordering::SeqCst));
    assert!(surface.hidden.load(Ordering::SeqCst));
}

#[tokio::test]
async fn late_readiness_of_a_timed_out_job_is_not_taken_by_the_next_one() {
    let surface = Arc::new(DelayedSurface::new(vec![
        Duration::from_millis(300),
        Duration::from_millis(150),
    ]));
    let mut slow = settings();
    slow.ready_timeout_ms = 200;
    let coordinator = coordinator_for(Arc::clone(&surface) as Arc<dyn RenderSurface>, slow);
    coordinator.initialize(window()).expect("initialize");

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. first\n")).await })
    };
    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. second\n")).await })
    };

    assert_eq!(
        first.await.expect("join"),
        Ok(PrintOutcome::failed(PrintFailureReason::SurfaceTimeout))
    );
    assert_eq!(second.await.expect("join"), Ok(PrintOutcome::printed()));
    assert_eq!(
        *surface.printed.lock().expect("printed"),
        vec!["1. second\n".to_string()]
    );
}

#[tokio::test]
async fn shutdown_with_jobs_in_flight_and_queued_fails_both() {
    let gate = Arc::new(Semaphore::new(0));
    let (coordinator, surface) = scripted(ScriptedSurface::gated(gate));
    coordinator.initialize(window()).expect("initialize");

    let in_flight = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. a\n")).await })
    };
    wait_for(|| surface.deliveries().len() == 1).await;
    let queued = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.submit(PrintJob::new("1. b\n")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    coordinator.shutdown();

    let failed = PrintOutcome::failed(PrintFailureReason::SurfaceClosed);
    assert_eq!(in_flight.await.expect("join"), Ok(failed));
    assert_eq!(queued.await.expect("join"), Ok(failed));
    assert!(surface.is_destroyed());
    assert!(surface.printed().is_empty());
    assert_eq!(coordinator.lifecycle(), Lifecycle::Closed);
}

#[tokio::test]
async fn dropping_the_coordinator_tears_down_the_surface() {
    let gate = Arc::new(Semaphore::new(0));
    let (coordinator, surface) = scripted(ScriptedSurface::gated(gate));
    coordinator.initialize(window()).expect("initialize");
    let pending = coordinator.enqueue(PrintJob::new("1. a\n")).expect("enqueue");
    wait_for(|| surface.deliveries().len() == 1).await;

    drop(coordinator);

    assert!(surface.is_destroyed());
    assert!(pending.await.is_err());
}
