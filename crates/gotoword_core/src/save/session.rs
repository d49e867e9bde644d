//! Per-invocation state threaded through the save resolver.
//!
//! # Responsibility
//! - Hold the keyword, the looked-up note, the context argument and the
//!   buffer snapshot for one save.
//! - Accumulate the resolved context and the final action.
//! - Replay queued answers first-in-first-out.
//!
//! # Invariants
//! - A session is created for one save and dropped at its end.
//! - `action` is set exactly once, by a terminal state.

use crate::model::context::Context;
use crate::model::name::normalize_name;
use crate::model::note::Note;
use crate::save::SaveError;
use crate::service::panel::is_note_header;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Store mutation a save resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveAction {
    /// New note with its first definition.
    CreateNote,
    /// New definition on an existing note.
    AttachDefinition,
    /// Existing `(note, context)` definition overwritten.
    UpdateDefinition,
    /// User aborted; nothing written.
    Abort,
}

/// Context the definition will be scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedContext {
    /// Context-less definition.
    NoContext,
    /// Context already present in the store.
    Existing(Context),
    /// Context that must be created before the definition.
    New { name: String, description: String },
}

impl ResolvedContext {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New { .. })
    }
}

/// Context the caller currently shows the note under.
///
/// Saving an existing note without a context argument targets this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveContext {
    NoContext,
    Named(String),
}

/// Final result of one save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub action: SaveAction,
    /// Saved note; `None` on abort.
    pub note: Option<Note>,
    /// Context of the written definition; `None` for context-less or abort.
    pub context: Option<Context>,
    /// Whether the save created the context.
    pub created_context: bool,
}

impl SaveOutcome {
    /// Whether the save wrote to the store.
    pub fn is_committed(&self) -> bool {
        self.action != SaveAction::Abort
    }
}

/// Ephemeral state of one save invocation.
#[derive(Debug, Clone)]
pub struct SaveSession {
    word: String,
    pub(crate) note: Option<Note>,
    context_arg: String,
    active_context: Option<ActiveContext>,
    body: String,
    answers: VecDeque<String>,
    resolved_context: Option<ResolvedContext>,
    context_created: bool,
    action: Option<SaveAction>,
    /// Invalid answers given at the current prompt.
    pub(crate) attempts: u32,
}

impl SaveSession {
    /// Builds a session from the caller's lookup and buffer snapshot.
    ///
    /// `context_arg` may be empty. A blank argument counts as empty.
    pub fn new(
        word: &str,
        note: Option<Note>,
        context_arg: &str,
        buffer_lines: &[String],
    ) -> Result<Self, SaveError> {
        let word = normalize_name(word).map_err(SaveError::InvalidWord)?;
        let context_arg = if context_arg.trim().is_empty() {
            String::new()
        } else {
            normalize_name(context_arg).map_err(SaveError::InvalidContextName)?
        };
        let body = snapshot_body(&word, buffer_lines);

        Ok(Self {
            word,
            note,
            context_arg,
            active_context: None,
            body,
            answers: VecDeque::new(),
            resolved_context: None,
            context_created: false,
            action: None,
            attempts: 0,
        })
    }

    /// Sets the context the caller currently shows the note under.
    pub fn with_active_context(mut self, active_context: Option<ActiveContext>) -> Self {
        self.active_context = active_context;
        self
    }

    /// Queues answers consumed before any live prompt.
    pub fn with_answers<I, A>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.answers.extend(answers.into_iter().map(Into::into));
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn note(&self) -> Option<&Note> {
        self.note.as_ref()
    }

    /// Normalized context argument, empty when none was given.
    pub fn context_arg(&self) -> &str {
        &self.context_arg
    }

    pub fn active_context(&self) -> Option<&ActiveContext> {
        self.active_context.as_ref()
    }

    /// Definition body derived from the buffer snapshot.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn resolved_context(&self) -> Option<&ResolvedContext> {
        self.resolved_context.as_ref()
    }

    /// Whether this save creates (or created) a context.
    pub fn create_context(&self) -> bool {
        self.context_created
            || self
                .resolved_context
                .as_ref()
                .is_some_and(ResolvedContext::is_new)
    }

    pub fn action(&self) -> Option<SaveAction> {
        self.action
    }

    /// Number of queued answers not consumed yet.
    pub fn queued_answers(&self) -> usize {
        self.answers.len()
    }

    pub(crate) fn take_queued_answer(&mut self) -> Option<String> {
        self.answers.pop_front()
    }

    pub(crate) fn resolve(&mut self, resolved: ResolvedContext) {
        self.resolved_context = Some(resolved);
        self.attempts = 0;
    }

    pub(crate) fn mark_context_created(&mut self) {
        self.context_created = true;
    }

    pub(crate) fn finish(&mut self, action: SaveAction) {
        self.action = Some(action);
    }

    /// Name of the context waiting to be created, if any.
    pub(crate) fn pending_context_name(&self) -> Option<&str> {
        match self.resolved_context.as_ref() {
            Some(ResolvedContext::New { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    pub(crate) fn outcome(&self) -> Result<SaveOutcome, SaveError> {
        let action = self.action.ok_or_else(|| {
            SaveError::InconsistentState("resolver stopped without an action".to_string())
        })?;
        if action == SaveAction::Abort {
            return Ok(SaveOutcome {
                action,
                note: None,
                context: None,
                created_context: false,
            });
        }

        let context = match self.resolved_context.as_ref() {
            Some(ResolvedContext::Existing(context)) => Some(context.clone()),
            _ => None,
        };
        Ok(SaveOutcome {
            action,
            note: self.note.clone(),
            context,
            created_context: self.context_created,
        })
    }
}

/// Joins buffer lines into a definition body.
///
/// A leading read-panel header rendered for this same word is dropped, so a
/// note that was shown and then edited in place does not store its header.
pub fn snapshot_body(word: &str, buffer_lines: &[String]) -> String {
    let lines = match buffer_lines.split_first() {
        Some((first, rest)) if is_note_header(word, first) => rest,
        _ => buffer_lines,
    };
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{snapshot_body, SaveSession};
    use crate::save::SaveError;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn session_normalizes_word_and_context() {
        let session = SaveSession::new(" RGB ", None, " Kivy ", &lines(&["red"])).unwrap();
        assert_eq!(session.word(), "rgb");
        assert_eq!(session.context_arg(), "kivy");
        assert_eq!(session.body(), "red");
        assert!(session.action().is_none());
    }

    #[test]
    fn blank_context_argument_counts_as_none() {
        let session = SaveSession::new("rgb", None, "   ", &[]).unwrap();
        assert_eq!(session.context_arg(), "");
        assert_eq!(session.body(), "");
    }

    #[test]
    fn blank_word_is_rejected() {
        let err = SaveSession::new("  ", None, "", &[]).unwrap_err();
        assert!(matches!(err, SaveError::InvalidWord(_)));
    }

    #[test]
    fn queued_answers_are_consumed_in_order() {
        let mut session = SaveSession::new("rgb", None, "", &[])
            .unwrap()
            .with_answers(["1", "python"]);
        assert_eq!(session.queued_answers(), 2);
        assert_eq!(session.take_queued_answer().as_deref(), Some("1"));
        assert_eq!(session.take_queued_answer().as_deref(), Some("python"));
        assert_eq!(session.take_queued_answer(), None);
    }

    #[test]
    fn snapshot_drops_header_of_same_word_only() {
        let shown = lines(&["keyword: rgb   contexts: python", "red green blue"]);
        assert_eq!(snapshot_body("rgb", &shown), "red green blue");

        let other = lines(&["keyword: canvas   contexts: kivy", "text"]);
        assert_eq!(
            snapshot_body("rgb", &other),
            "keyword: canvas   contexts: kivy\ntext"
        );
    }
}
