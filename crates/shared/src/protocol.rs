//! Messages exchanged between the requesting process, the print host, and
//! the host's hidden print surface. Every channel is one-way.

use serde::{Deserialize, Serialize};

use crate::{domain::PrintOutcome, error::PrintFailureReason};

/// requester -> host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RequesterMessage {
    PrintJob { content: String },
}

/// host -> requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum HostMessage {
    WroteJob {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<PrintFailureReason>,
    },
}

impl From<PrintOutcome> for HostMessage {
    fn from(value: PrintOutcome) -> Self {
        Self::WroteJob {
            success: value.success,
            reason: value.reason,
        }
    }
}

impl From<HostMessage> for PrintOutcome {
    fn from(value: HostMessage) -> Self {
        match value {
            HostMessage::WroteJob { success, reason } => Self { success, reason },
        }
    }
}

/// host -> surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SurfaceCommand {
    PrintJob { content: String },
}

/// surface -> host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SurfaceSignal {
    ReadyToPrintJob,
}

/// Encodes one message as a single JSON line (without the trailing newline).
pub fn to_wire_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

pub fn from_wire_line<'a, T: Deserialize<'a>>(line: &'a str) -> serde_json::Result<T> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
