//! Host-process side of printing: the coordinator that owns the hidden print
//! surface and the loops that serve requester channels.

pub mod config;
mod coordinator;
pub mod ipc;

pub use config::{load_settings, PrintSettings};
pub use coordinator::{CoordinatorError, Lifecycle, PrintCoordinator};
pub use ipc::{serve_json_lines, serve_requester};
