//! Requester side of printing and clipboard access for the phrase editor.

pub mod bridge;
pub mod clipboard;
pub mod error;
pub mod phrase_actions;
pub mod transport;

pub use bridge::{PrintBridge, DEFAULT_COMPLETION_TIMEOUT};
pub use clipboard::{ClipboardProvider, MemoryClipboard, SystemClipboard};
pub use error::{BridgeError, ClipboardError};
pub use phrase_actions::{copy_phrase, paste_phrase, print_phrase};
pub use transport::connect_json_lines;
