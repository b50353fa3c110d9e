use recovery_phrase::EditorError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("system clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard access failed: {0}")]
    Access(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("print host disconnected")]
    HostDisconnected,
    #[error("no print completion within {0:?}")]
    CompletionTimedOut(std::time::Duration),
    #[error("recovery phrase is empty")]
    EmptyPhrase,
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Editor(#[from] EditorError),
}
