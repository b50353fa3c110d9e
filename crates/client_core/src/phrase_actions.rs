//! Phrase editor actions that go through the bridge: copy, paste, print.

use recovery_phrase::PhraseEditor;
use shared::domain::PrintOutcome;

use crate::{bridge::PrintBridge, error::BridgeError};

pub fn copy_phrase(editor: &PhraseEditor, bridge: &PrintBridge) -> Result<(), BridgeError> {
    if editor.is_empty() {
        return Err(BridgeError::EmptyPhrase);
    }
    bridge.request_copy_to_clipboard(&editor.copy_text())
}

/// Pastes the clipboard into the editor. A rejected paste leaves the phrase
/// as it was; the error is returned so the caller can decide whether to show
/// it.
pub fn paste_phrase(editor: &mut PhraseEditor, bridge: &PrintBridge) -> Result<(), BridgeError> {
    let text = bridge.request_read_clipboard();
    editor.paste_text(&text)?;
    Ok(())
}

pub async fn print_phrase(
    editor: &PhraseEditor,
    bridge: &PrintBridge,
) -> Result<PrintOutcome, BridgeError> {
    if editor.is_empty() {
        return Err(BridgeError::EmptyPhrase);
    }
    bridge.print(&editor.copy_text()).await
}
