use std::fmt;

use zeroize::Zeroize;

use crate::error::PhraseError;

/// Longest phrase the editor accepts and the decoder will extract.
pub const MAX_WORDS: usize = 24;

/// One slot of a phrase. `id` is the slot index, not a wordlist index.
#[derive(Clone, PartialEq, Eq)]
pub struct Word {
    pub id: usize,
    pub value: String,
}

impl Word {
    pub fn new(id: usize, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Word")
            .field("id", &self.id)
            .field("value", &if self.value.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl Zeroize for Word {
    fn zeroize(&mut self) {
        self.value.zeroize();
    }
}

/// Fixed-length ordered list of recovery words.
///
/// Slot ids are always `0..len` in order. Values are wiped from memory when
/// the phrase is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Phrase {
    words: Vec<Word>,
}

impl Phrase {
    /// A phrase of `word_count` empty slots.
    pub fn empty(word_count: usize) -> Result<Self, PhraseError> {
        check_word_count(word_count)?;
        Ok(Self {
            words: (0..word_count).map(|id| Word::new(id, "")).collect(),
        })
    }

    pub fn from_values<I, S>(values: I) -> Result<Self, PhraseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = values
            .into_iter()
            .enumerate()
            .map(|(id, value)| Word::new(id, value))
            .collect::<Vec<_>>();
        check_word_count(words.len())?;
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn get(&self, id: usize) -> Option<&Word> {
        self.words.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|word| word.value.as_str())
    }

    /// True when every slot is empty.
    pub fn is_blank(&self) -> bool {
        self.words.iter().all(Word::is_blank)
    }

    pub(crate) fn set_value(&mut self, id: usize, value: String) -> bool {
        let Some(word) = self.words.get_mut(id) else {
            return false;
        };
        word.value.zeroize();
        word.value = value;
        true
    }

    pub(crate) fn clear_values(&mut self) {
        for word in &mut self.words {
            word.zeroize();
        }
    }
}

impl fmt::Debug for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.words).finish()
    }
}

impl Drop for Phrase {
    fn drop(&mut self) {
        self.clear_values();
    }
}

fn check_word_count(word_count: usize) -> Result<(), PhraseError> {
    if word_count == 0 || word_count > MAX_WORDS {
        return Err(PhraseError::InvalidWordCount(word_count));
    }
    Ok(())
}
