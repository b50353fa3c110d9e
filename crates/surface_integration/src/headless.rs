//! In-process window and print surface for hosts without a display. The
//! surface "renders" by keeping the delivered text and its print action
//! appends that text to a [`PrintSpool`].

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use shared::protocol::{SurfaceCommand, SurfaceSignal};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{DestroyHook, DestroyHooks, HostWindow, RenderSurface, SurfaceFactory};

pub struct HeadlessWindow {
    label: String,
    hooks: DestroyHooks,
}

impl HeadlessWindow {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            hooks: DestroyHooks::default(),
        })
    }

    pub fn destroy(&self) {
        if self.hooks.fire() {
            info!(window = %self.label, "host window destroyed");
        }
    }
}

impl HostWindow for HeadlessWindow {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_destroyed(&self) -> bool {
        self.hooks.is_destroyed()
    }

    fn on_destroyed(&self, hook: DestroyHook) {
        self.hooks.register(hook);
    }
}

/// Printed documents, kept in memory and optionally written to a directory.
#[derive(Clone, Default)]
pub struct PrintSpool {
    documents: Arc<Mutex<Vec<String>>>,
    directory: Option<PathBuf>,
    sequence: Arc<AtomicU64>,
}

impl PrintSpool {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn write(&self, document: String) -> anyhow::Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(directory) = &self.directory {
            tokio::fs::create_dir_all(directory)
                .await
                .with_context(|| format!("failed to create spool dir '{}'", directory.display()))?;
            let path = directory.join(format!(
                "print-{}-{sequence:04}.txt",
                Utc::now().format("%Y%m%dT%H%M%S%.3f")
            ));
            tokio::fs::write(&path, document.as_bytes())
                .await
                .with_context(|| format!("failed to write spool file '{}'", path.display()))?;
            info!(path = %path.display(), "spooled print job");
        }
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document);
        Ok(())
    }
}

pub struct HeadlessSurface {
    hooks: DestroyHooks,
    parent: Mutex<Option<String>>,
    hidden: AtomicBool,
    loaded_uri: Mutex<Option<String>>,
    rendered: Mutex<Option<String>>,
    signals: broadcast::Sender<SurfaceSignal>,
    spool: PrintSpool,
}

impl HeadlessSurface {
    pub fn new(spool: PrintSpool) -> Arc<Self> {
        let (signals, _) = broadcast::channel(16);
        Arc::new(Self {
            hooks: DestroyHooks::default(),
            parent: Mutex::new(None),
            hidden: AtomicBool::new(false),
            loaded_uri: Mutex::new(None),
            rendered: Mutex::new(None),
            signals,
            spool,
        })
    }

    pub fn parent_label(&self) -> Option<String> {
        self.parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    pub fn loaded_uri(&self) -> Option<String> {
        self.loaded_uri
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RenderSurface for HeadlessSurface {
    fn set_parent(&self, owner: &Arc<dyn HostWindow>) {
        *self.parent.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(owner.label().to_string());
    }

    fn hide(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }

    fn load_content(&self, uri: &str) -> anyhow::Result<()> {
        if self.is_destroyed() {
            return Err(anyhow!("surface destroyed before loading '{uri}'"));
        }
        *self.loaded_uri.lock().unwrap_or_else(PoisonError::into_inner) = Some(uri.to_string());
        Ok(())
    }

    fn send(&self, command: SurfaceCommand) -> anyhow::Result<()> {
        if self.is_destroyed() {
            return Err(anyhow!("surface destroyed"));
        }
        if self.loaded_uri().is_none() {
            return Err(anyhow!("print page not loaded"));
        }
        match command {
            SurfaceCommand::PrintJob { content } => {
                debug!(bytes = content.len(), "surface rendered print job");
                *self.rendered.lock().unwrap_or_else(PoisonError::into_inner) = Some(content);
                let _ = self.signals.send(SurfaceSignal::ReadyToPrintJob);
            }
        }
        Ok(())
    }

    fn subscribe_signals(&self) -> broadcast::Receiver<SurfaceSignal> {
        self.signals.subscribe()
    }

    async fn print(&self) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let document = self
            .rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(document) = document else {
            warn!("print requested with nothing rendered");
            return false;
        };
        match self.spool.write(document).await {
            Ok(()) => true,
            Err(err) => {
                warn!("headless print failed: {err:#}");
                false
            }
        }
    }

    fn open_devtools(&self) {
        debug!("headless surface has no dev tools");
    }

    fn destroy(&self) {
        if self.hooks.fire() {
            self.rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            debug!("headless print surface destroyed");
        }
    }

    fn is_destroyed(&self) -> bool {
        self.hooks.is_destroyed()
    }

    fn on_destroyed(&self, hook: DestroyHook) {
        self.hooks.register(hook);
    }
}

#[derive(Default)]
pub struct HeadlessSurfaceFactory {
    spool: PrintSpool,
    created: Mutex<Vec<Arc<HeadlessSurface>>>,
}

impl HeadlessSurfaceFactory {
    pub fn new(spool: PrintSpool) -> Self {
        Self {
            spool,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn spool(&self) -> &PrintSpool {
        &self.spool
    }

    pub fn created(&self) -> Vec<Arc<HeadlessSurface>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create_surface(&self) -> anyhow::Result<Arc<dyn RenderSurface>> {
        let surface = HeadlessSurface::new(self.spool.clone());
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&surface));
        Ok(surface)
    }
}
