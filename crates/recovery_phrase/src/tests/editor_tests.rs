use std::sync::{Arc, Mutex};

use super::*;
use crate::error::DecodeError;

fn recording_editor(word_count: usize) -> (PhraseEditor, Arc<Mutex<Vec<Vec<String>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let editor = PhraseEditor::new(word_count, false)
        .expect("editor")
        .on_change(move |phrase: &Phrase| {
            sink.lock()
                .expect("sink")
                .push(phrase.values().map(str::to_string).collect());
        });
    (editor, seen)
}

#[test]
fn set_word_updates_one_slot_and_notifies_with_full_phrase() {
    let (mut editor, seen) = recording_editor(3);

    editor.set_word(1, "ability").expect("set word");

    let values: Vec<&str> = editor.phrase().values().collect();
    assert_eq!(values, ["", "ability", ""]);
    assert_eq!(editor.phrase().get(1).map(|word| word.id), Some(1));
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![vec!["".to_string(), "ability".to_string(), "".to_string()]]
    );
}

#[test]
fn set_word_refuses_read_only_and_unknown_slots() {
    let (mut editor, seen) = recording_editor(2);

    assert_eq!(editor.set_word(2, "able"), Err(EditorError::UnknownSlot(2)));
    editor.set_read_only(true);
    assert_eq!(editor.set_word(0, "able"), Err(EditorError::ReadOnly));

    assert!(editor.is_empty());
    assert!(seen.lock().expect("seen").is_empty());
}

#[test]
fn clear_empties_every_slot_with_one_notification() {
    let (mut editor, seen) = recording_editor(2);
    editor.set_word(0, "apple").expect("set");
    editor.set_word(1, "banana").expect("set");
    seen.lock().expect("seen").clear();

    editor.clear();

    assert!(editor.is_empty());
    assert_eq!(editor.word_count(), 2);
    assert_eq!(seen.lock().expect("seen").len(), 1);
}

#[test]
fn clearing_an_empty_phrase_twice_is_harmless() {
    let (mut editor, _) = recording_editor(12);
    let before = editor.phrase().clone();

    editor.clear();
    editor.clear();

    assert_eq!(*editor.phrase(), before);
    assert!(editor.is_empty());
}

#[test]
fn is_empty_tracks_any_non_empty_value() {
    let (mut editor, _) = recording_editor(12);
    assert!(editor.is_empty());
    editor.set_word(11, "zoo").expect("set");
    assert!(!editor.is_empty());
    editor.set_word(11, "").expect("set");
    assert!(editor.is_empty());
}

#[test]
fn copy_text_is_canonical_and_does_not_notify() {
    let (mut editor, seen) = recording_editor(2);
    editor.set_word(0, "apple").expect("set");
    seen.lock().expect("seen").clear();

    assert_eq!(editor.copy_text(), "1. apple\n2. \n");
    assert!(seen.lock().expect("seen").is_empty());
}

#[test]
fn paste_replaces_phrase_once() {
    let (mut editor, seen) = recording_editor(3);

    editor
        .paste_text("1. apple\n2. banana\n3. cherry\n")
        .expect("paste");

    let values: Vec<&str> = editor.phrase().values().collect();
    assert_eq!(values, ["apple", "banana", "cherry"]);
    assert_eq!(seen.lock().expect("seen").len(), 1);
}

#[test]
fn failed_paste_leaves_phrase_untouched_and_silent() {
    let (mut editor, seen) = recording_editor(3);
    editor.set_word(0, "keep").expect("set");
    seen.lock().expect("seen").clear();
    let before = editor.phrase().clone();

    assert_eq!(
        editor.paste_text("1. apple\n2. banana\n"),
        Err(EditorError::Decode(DecodeError::WrongCount(2, 3)))
    );
    assert_eq!(
        editor.paste_text("2. apple\n3. banana\n4. cherry\n"),
        Err(EditorError::Decode(DecodeError::BadStart))
    );

    assert_eq!(*editor.phrase(), before);
    assert!(seen.lock().expect("seen").is_empty());
}

#[test]
fn paste_is_refused_when_read_only() {
    let phrase = Phrase::from_values(["apple", "banana"]).expect("phrase");
    let mut editor = PhraseEditor::with_phrase(phrase.clone(), true);

    assert_eq!(
        editor.paste_text("1. cherry\n2. date\n"),
        Err(EditorError::ReadOnly)
    );
    assert_eq!(*editor.phrase(), phrase);
}

#[test]
fn affordances_follow_emptiness_and_read_only() {
    let (mut editor, _) = recording_editor(2);
    assert_eq!(editor.affordances(), Affordances::default());

    editor.set_word(0, "apple").expect("set");
    assert_eq!(
        editor.affordances(),
        Affordances {
            copy: true,
            clear: true,
            print: true,
        }
    );

    editor.set_read_only(true);
    assert_eq!(
        editor.affordances(),
        Affordances {
            copy: true,
            clear: false,
            print: true,
        }
    );
}

#[test]
fn rejects_unsupported_word_counts() {
    assert!(matches!(
        PhraseEditor::new(0, false),
        Err(PhraseError::InvalidWordCount(0))
    ));
    assert!(matches!(
        PhraseEditor::new(25, false),
        Err(PhraseError::InvalidWordCount(25))
    ));
}

#[test]
fn debug_output_redacts_words() {
    let phrase = Phrase::from_values(["secret", ""]).expect("phrase");
    let rendered = format!("{phrase:?}");
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("<redacted>"));
}
