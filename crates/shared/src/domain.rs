use serde::{Deserialize, Serialize};

use crate::error::PrintFailureReason;

/// Text handed to the host for printing. Jobs carry no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub content: String,
}

impl PrintJob {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<PrintFailureReason>,
}

impl PrintOutcome {
    pub fn printed() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    pub fn failed(reason: PrintFailureReason) -> Self {
        Self {
            success: false,
            reason: Some(reason),
        }
    }
}
