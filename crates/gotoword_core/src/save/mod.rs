//! Save resolution: turning an edit buffer into a stored definition.
//!
//! # Responsibility
//! - Decide which note, context and definition a save targets.
//! - Ask the user only for what the store cannot answer.
//! - Report failures with one error type.

pub mod prompt;
pub mod resolver;
pub mod session;
pub mod state;

use crate::model::name::NameError;
use crate::repo::note_repo::RepoError;
use prompt::{PromptKind, SurfaceError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use prompt::{ContextChoice, EditSurface, Prompt};
pub use resolver::{ExhaustedAnswers, Resolver, ResolverConfig, Step};
pub use session::{ActiveContext, ResolvedContext, SaveAction, SaveOutcome, SaveSession};
pub use state::{SaveState, Transition};

/// Save failure.
#[derive(Debug)]
pub enum SaveError {
    /// Keyword is blank or spans lines.
    InvalidWord(NameError),
    /// Context name is blank or spans lines.
    InvalidContextName(NameError),
    /// Store read or write failed; the save was rolled back.
    StoreUnavailable(RepoError),
    /// Existing note has several definitions and no active context was given.
    AmbiguousContext { note: String, contexts: Vec<String> },
    /// Queued answers ran out and no live surface may be asked.
    AnswersExhausted(PromptKind),
    /// Edit surface failed while prompting or reading the buffer.
    Surface(SurfaceError),
    /// Resolver reached a state its inputs cannot explain.
    InconsistentState(String),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWord(err) => write!(f, "invalid keyword: {err}"),
            Self::InvalidContextName(err) => write!(f, "invalid context name: {err}"),
            Self::StoreUnavailable(err) => write!(f, "keyword store unavailable: {err}"),
            Self::AmbiguousContext { note, contexts } => write!(
                f,
                "keyword `{note}` has definitions in several contexts ({}); choose one",
                contexts.join("; ")
            ),
            Self::AnswersExhausted(kind) => write!(f, "no answer available for prompt `{kind}`"),
            Self::Surface(err) => write!(f, "{err}"),
            Self::InconsistentState(message) => write!(f, "inconsistent save state: {message}"),
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidWord(err) | Self::InvalidContextName(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
            Self::Surface(err) => Some(err),
            Self::AmbiguousContext { .. }
            | Self::AnswersExhausted(_)
            | Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for SaveError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidName(err) => Self::InvalidContextName(err),
            RepoError::Duplicate { entity, name } => {
                Self::InconsistentState(format!("unexpected duplicate {entity} `{name}`"))
            }
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<rusqlite::Error> for SaveError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreUnavailable(RepoError::from(value))
    }
}

impl From<SurfaceError> for SaveError {
    fn from(value: SurfaceError) -> Self {
        Self::Surface(value)
    }
}
