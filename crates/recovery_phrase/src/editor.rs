use tracing::debug;

use crate::{
    codec,
    error::{EditorError, PhraseError},
    phrase::Phrase,
};

pub type ChangeCallback = Box<dyn FnMut(&Phrase) + Send>;

/// Which phrase actions the owning view should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub copy: bool,
    pub clear: bool,
    pub print: bool,
}

/// Editable recovery phrase of a fixed word count.
///
/// Every successful mutation reports the full phrase to the change callback
/// exactly once. Failed mutations leave the phrase untouched and report
/// nothing.
pub struct PhraseEditor {
    phrase: Phrase,
    read_only: bool,
    on_change: Option<ChangeCallback>,
}

impl PhraseEditor {
    pub fn new(word_count: usize, read_only: bool) -> Result<Self, PhraseError> {
        Ok(Self::with_phrase(Phrase::empty(word_count)?, read_only))
    }

    pub fn with_phrase(phrase: Phrase, read_only: bool) -> Self {
        Self {
            phrase,
            read_only,
            on_change: None,
        }
    }

    pub fn on_change(mut self, callback: impl FnMut(&Phrase) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    pub fn word_count(&self) -> usize {
        self.phrase.len()
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_word(&mut self, id: usize, value: impl Into<String>) -> Result<(), EditorError> {
        if self.read_only {
            return Err(EditorError::ReadOnly);
        }
        if !self.phrase.set_value(id, value.into()) {
            return Err(EditorError::UnknownSlot(id));
        }
        self.notify();
        Ok(())
    }

    /// Empties every slot in one update. Read-only is enforced by the caller
    /// through [`PhraseEditor::affordances`].
    pub fn clear(&mut self) {
        self.phrase.clear_values();
        self.notify();
    }

    pub fn copy_text(&self) -> String {
        codec::encode(&self.phrase)
    }

    /// Replaces the whole phrase with one decoded from `text`.
    pub fn paste_text(&mut self, text: &str) -> Result<(), EditorError> {
        if self.read_only {
            return Err(EditorError::ReadOnly);
        }
        let phrase = codec::decode(text, self.phrase.len()).inspect_err(|err| {
            debug!(word_count = self.phrase.len(), "ignoring pasted text: {err}");
        })?;
        self.phrase = phrase;
        self.notify();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.phrase.is_blank()
    }

    pub fn affordances(&self) -> Affordances {
        let has_words = !self.is_empty();
        Affordances {
            copy: has_words,
            clear: has_words && !self.read_only,
            print: has_words,
        }
    }

    fn notify(&mut self) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.phrase);
        }
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
