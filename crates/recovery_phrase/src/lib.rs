//! Recovery phrase model, its canonical text codec, and the in-memory editor
//! state that backs the phrase entry screen.

pub mod codec;
pub mod editor;
pub mod error;
pub mod phrase;

pub use codec::{decode, encode};
pub use editor::{Affordances, PhraseEditor};
pub use error::{DecodeError, EditorError, PhraseError};
pub use phrase::{Phrase, Word, MAX_WORDS};
