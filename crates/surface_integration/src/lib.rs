use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use async_trait::async_trait;
use shared::protocol::{SurfaceCommand, SurfaceSignal};
use tokio::sync::broadcast;

pub mod headless;

pub use headless::{HeadlessSurface, HeadlessSurfaceFactory, HeadlessWindow, PrintSpool};

pub type DestroyHook = Box<dyn FnOnce() + Send + 'static>;

/// The primary application window that owns the print surface.
pub trait HostWindow: Send + Sync {
    fn label(&self) -> &str;
    fn is_destroyed(&self) -> bool;
    /// Runs `hook` once when the window is destroyed, immediately if it
    /// already is.
    fn on_destroyed(&self, hook: DestroyHook);
}

/// Hidden rendering target used only to produce print output.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn set_parent(&self, owner: &Arc<dyn HostWindow>);
    fn hide(&self);
    fn load_content(&self, uri: &str) -> anyhow::Result<()>;
    fn send(&self, command: SurfaceCommand) -> anyhow::Result<()>;
    fn subscribe_signals(&self) -> broadcast::Receiver<SurfaceSignal>;
    /// Platform print of whatever the surface currently renders.
    async fn print(&self) -> bool;
    fn open_devtools(&self) {}
    /// Idempotent.
    fn destroy(&self);
    fn is_destroyed(&self) -> bool;
    /// Same contract as [`HostWindow::on_destroyed`].
    fn on_destroyed(&self, hook: DestroyHook);
}

pub trait SurfaceFactory: Send + Sync {
    fn create_surface(&self) -> anyhow::Result<Arc<dyn RenderSurface>>;
}

/// Destroyed flag plus the hooks waiting on it, for window and surface
/// implementations.
#[derive(Default)]
pub struct DestroyHooks {
    destroyed: AtomicBool,
    hooks: Mutex<Vec<DestroyHook>>,
}

impl DestroyHooks {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn register(&self, hook: DestroyHook) {
        {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_destroyed() {
                hooks.push(hook);
                return;
            }
        }
        hook();
    }

    /// Marks destroyed and runs pending hooks. Returns false when already
    /// destroyed.
    pub fn fire(&self) -> bool {
        let hooks = {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if self.destroyed.swap(true, Ordering::SeqCst) {
                return false;
            }
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            hook();
        }
        true
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
