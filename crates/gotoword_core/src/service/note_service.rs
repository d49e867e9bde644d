//! Read-panel use-case service.
//!
//! # Responsibility
//! - Look notes up for display and pick the definition to show.
//! - Provide the listing commands (words, contexts, cross references).
//! - Delete notes and contexts by name.
//!
//! # Invariants
//! - Names are normalized before every lookup.
//! - Listing calls never write.

use crate::model::context::Context;
use crate::model::name::{normalize_name, NameError};
use crate::model::note::{Definition, Note};
use crate::repo::note_repo::{NoteStore, RepoError};
use crate::save::session::ActiveContext;
use crate::service::panel;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for read-panel use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    NoteNotFound(String),
    ContextNotFound(String),
    /// Note exists but holds no definition for the requested context.
    DefinitionNotFound { note: String, context: String },
    InvalidName(NameError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(name) => write!(f, "keyword not found: `{name}`"),
            Self::ContextNotFound(name) => write!(f, "context not found: `{name}`"),
            Self::DefinitionNotFound { note, context } => {
                write!(f, "keyword `{note}` has no definition in context `{context}`")
            }
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidName(err) => Self::InvalidName(err),
            other => Self::Repo(other),
        }
    }
}

impl From<NameError> for NoteServiceError {
    fn from(value: NameError) -> Self {
        Self::InvalidName(value)
    }
}

/// A note prepared for the read panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub note: Note,
    /// Every definition of the note in creation order.
    pub definitions: Vec<Definition>,
    /// Definition whose body is shown; `None` when the note holds none.
    pub shown: Option<Definition>,
}

impl NoteView {
    /// Context a save of the edited panel should target.
    pub fn active_context(&self) -> Option<ActiveContext> {
        self.shown.as_ref().map(|definition| match definition.context_name() {
            Some(name) => ActiveContext::Named(name.to_string()),
            None => ActiveContext::NoContext,
        })
    }

    pub fn lines(&self) -> Vec<String> {
        match self.shown.as_ref() {
            Some(shown) => panel::render_note(&self.note, &self.definitions, shown),
            None => vec![panel::note_header(&self.note.name, &[])],
        }
    }
}

/// Read-panel service facade over a keyword store.
pub struct NoteService<R: NoteStore> {
    repo: R,
}

impl<R: NoteStore> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads `word` for display.
    ///
    /// Without `context` the context-less definition is preferred, then the
    /// oldest one. Returns `Ok(None)` for an unknown word.
    pub fn show_note(
        &self,
        word: &str,
        context: Option<&str>,
    ) -> Result<Option<NoteView>, NoteServiceError> {
        let name = normalize_name(word)?;
        let Some(note) = self.repo.find_note(&name)? else {
            return Ok(None);
        };
        let definitions = self.repo.list_definitions(&note)?;

        let shown = match context {
            Some(context) => {
                let context = normalize_name(context)?;
                let found = definitions
                    .iter()
                    .find(|definition| definition.context_name() == Some(context.as_str()))
                    .cloned();
                match found {
                    Some(definition) => Some(definition),
                    None => {
                        return Err(NoteServiceError::DefinitionNotFound {
                            note: note.name,
                            context,
                        })
                    }
                }
            }
            None => definitions
                .iter()
                .find(|definition| definition.context.is_none())
                .or_else(|| definitions.first())
                .cloned(),
        };

        Ok(Some(NoteView {
            note,
            definitions,
            shown,
        }))
    }

    /// Panel lines for `word`: the note, or the introduction for a new word.
    pub fn panel_lines(
        &self,
        word: &str,
        context: Option<&str>,
    ) -> Result<Vec<String>, NoteServiceError> {
        match self.show_note(word, context)? {
            Some(view) => Ok(view.lines()),
            None => Ok(panel::introduction_lines(&normalize_name(word)?)),
        }
    }

    pub fn all_words(&self) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.repo.list_notes()?)
    }

    pub fn all_contexts(&self) -> Result<Vec<Context>, NoteServiceError> {
        Ok(self.repo.list_contexts()?)
    }

    /// Notes holding a definition in context `name`.
    pub fn context_words(&self, name: &str) -> Result<(Context, Vec<Note>), NoteServiceError> {
        let context = self.require_context(name)?;
        let notes = self.repo.list_notes_in_context(&context)?;
        Ok((context, notes))
    }

    /// Definitions of note `word`, one per context.
    pub fn word_contexts(&self, word: &str) -> Result<(Note, Vec<Definition>), NoteServiceError> {
        let note = self.require_note(word)?;
        let definitions = self.repo.list_definitions(&note)?;
        Ok((note, definitions))
    }

    /// Deletes note `word` with all its definitions.
    pub fn delete_note(&self, word: &str) -> Result<Note, NoteServiceError> {
        let note = self.require_note(word)?;
        self.repo.delete_note(&note)?;
        info!(
            "event=note_delete module=service status=ok word={}",
            note.name
        );
        Ok(note)
    }

    /// Deletes context `name` and the definitions scoped to it.
    pub fn delete_context(&self, name: &str) -> Result<Context, NoteServiceError> {
        let context = self.require_context(name)?;
        self.repo.delete_context(&context)?;
        info!(
            "event=context_delete module=service status=ok context={}",
            context.name
        );
        Ok(context)
    }

    /// Creates context `name` ahead of any save, or returns the existing one.
    pub fn seed_context(&self, name: &str, description: &str) -> Result<Context, NoteServiceError> {
        let name = normalize_name(name)?;
        match self.repo.create_context(&name, description) {
            Ok(context) => Ok(context),
            Err(RepoError::Duplicate { .. }) => self.require_context(&name),
            Err(err) => Err(err.into()),
        }
    }

    fn require_note(&self, word: &str) -> Result<Note, NoteServiceError> {
        let name = normalize_name(word)?;
        self.repo
            .find_note(&name)?
            .ok_or(NoteServiceError::NoteNotFound(name))
    }

    fn require_context(&self, name: &str) -> Result<Context, NoteServiceError> {
        let name = normalize_name(name)?;
        self.repo
            .find_context(&name)?
            .ok_or(NoteServiceError::ContextNotFound(name))
    }
}
