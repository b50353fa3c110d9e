use std::sync::{Mutex, PoisonError};

use arboard::Clipboard;

use crate::error::ClipboardError;

/// Shared system clipboard, text only.
pub trait ClipboardProvider: Send + Sync {
    /// `Ok(None)` when the clipboard is empty or holds something other than
    /// text.
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard. A fresh handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardProvider for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(ClipboardError::Access(err.to_string())),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|err| ClipboardError::Access(err.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(text.into())),
        }
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}
