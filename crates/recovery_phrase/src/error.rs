use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("pasted text does not start at word 1")]
    BadStart,
    #[error("pasted text holds {0} words, expected {1}")]
    WrongCount(usize, usize),
    #[error("cannot decode a phrase of {0} words; expected 1..={max}", max = crate::MAX_WORDS)]
    UnsupportedCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhraseError {
    #[error("unsupported phrase length {0}; expected 1..={max}", max = crate::MAX_WORDS)]
    InvalidWordCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("recovery phrase is read-only")]
    ReadOnly,
    #[error("no word slot with id {0}")]
    UnknownSlot(usize),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
