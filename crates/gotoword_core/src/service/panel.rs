//! Read-panel text rendering.
//!
//! # Responsibility
//! - Render notes and listings as the lines shown in the read panel.
//! - Recognize the note header so a saved buffer can skip it.
//!
//! # Invariants
//! - Rendering is pure: no store access, no logging.
//! - The header of a note is always its first rendered line.

use crate::model::context::Context;
use crate::model::note::{Definition, Note};

pub use crate::save::state::NO_CONTEXT_LABEL;

const HEADER_PREFIX: &str = "keyword: ";
const HEADER_CONTEXTS: &str = "   contexts: ";

/// First panel line of a shown note.
pub fn note_header(name: &str, context_names: &[&str]) -> String {
    format!("{HEADER_PREFIX}{name}{HEADER_CONTEXTS}{}", context_names.join("; "))
}

/// Whether `line` is the header `note_header` renders for `word`.
pub fn is_note_header(word: &str, line: &str) -> bool {
    let Some(rest) = line.strip_prefix(HEADER_PREFIX) else {
        return false;
    };
    let name = match rest.find(HEADER_CONTEXTS.trim_end()) {
        Some(index) => &rest[..index],
        None => return false,
    };
    name.trim().eq_ignore_ascii_case(word.trim())
}

/// Panel text offered for a word with no stored note.
pub fn introduction_lines(word: &str) -> Vec<String> {
    vec![
        format!("The keyword \"{word}\" doesn't exist in the database. Would you like to add info about it?"),
        "Write the definition in this buffer and store it with `gotoword save`.".to_string(),
        "If you don't want to keep it, discard the buffer.".to_string(),
        String::new(),
        "All these lines can be deleted when adding info.".to_string(),
    ]
}

/// Header plus body of `shown`, listing every context of `note`.
pub fn render_note(note: &Note, definitions: &[Definition], shown: &Definition) -> Vec<String> {
    let context_names: Vec<&str> = definitions
        .iter()
        .map(|definition| definition.context_name().unwrap_or(NO_CONTEXT_LABEL))
        .collect();
    let mut lines = vec![note_header(&note.name, &context_names)];
    lines.extend(shown.body.lines().map(str::to_string));
    lines
}

pub fn render_words(notes: &[Note]) -> Vec<String> {
    notes.iter().map(|note| note.name.clone()).collect()
}

/// One `name\tdescription` line per context.
pub fn render_contexts(contexts: &[Context]) -> Vec<String> {
    contexts
        .iter()
        .map(|context| format!("{}\t{}", context.name, context.description))
        .collect()
}

pub fn render_context_words(context: &Context, notes: &[Note]) -> Vec<String> {
    let mut lines = vec![format!(
        "The following keywords have a meaning (definition) in '{}' context:",
        context.name
    )];
    lines.extend(render_words(notes));
    lines
}

/// Context name, first body line and a blank separator per definition.
pub fn render_word_contexts(note: &Note, definitions: &[Definition]) -> Vec<String> {
    let mut lines = vec![format!(
        "The keyword '{}' has information belonging to the following contexts:",
        note.name
    )];
    for definition in definitions {
        lines.push(
            definition
                .context_name()
                .unwrap_or(NO_CONTEXT_LABEL)
                .to_string(),
        );
        lines.push(definition.first_line().to_string());
        lines.push(String::new());
    }
    lines
}
