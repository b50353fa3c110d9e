//! Canonical text form of a phrase: one `"{n}. {word}\n"` line per slot,
//! numbered from 1. The same text is used for copy, print, and paste.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::DecodeError,
    phrase::{Phrase, MAX_WORDS},
};

// A numbered line whose word starts with a lowercase letter and runs to the
// end of the line. Leading indentation is tolerated, a trailing CR is not
// captured.
static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([0-9]+)\. ([a-z][^\r\n]*)").expect("numbered line pattern is valid")
});

pub fn encode(phrase: &Phrase) -> String {
    let mut text = String::new();
    for (index, value) in phrase.values().enumerate() {
        let _ = writeln!(text, "{}. {value}", index + 1);
    }
    text
}

/// Parses canonical text back into a phrase of exactly `expected_count` words,
/// which must itself be in `1..=MAX_WORDS`.
///
/// Extraction must begin at word 1 and stops at the first gap in numbering or
/// after [`MAX_WORDS`] words; anything else in `text` is ignored.
pub fn decode(text: &str, expected_count: usize) -> Result<Phrase, DecodeError> {
    if expected_count == 0 || expected_count > MAX_WORDS {
        return Err(DecodeError::UnsupportedCount(expected_count));
    }

    let mut values: Vec<&str> = Vec::new();

    for captures in NUMBERED_LINE.captures_iter(text) {
        let next = values.len() + 1;
        let index = captures[1].parse::<usize>().ok();
        if values.is_empty() && index != Some(1) {
            return Err(DecodeError::BadStart);
        }
        if index != Some(next) {
            break;
        }
        values.push(captures.get(2).map_or("", |word| word.as_str()));
        if values.len() == MAX_WORDS {
            break;
        }
    }

    let found = values.len();
    if found != expected_count {
        return Err(DecodeError::WrongCount(found, expected_count));
    }

    Phrase::from_values(values).map_err(|_| DecodeError::UnsupportedCount(expected_count))
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
