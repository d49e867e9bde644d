//! Note and definition domain model.
//!
//! # Invariants
//! - `Note::name` is normalized and unique across the store.
//! - A `Definition` with `context == None` is the note's context-less
//!   definition; a note has at most one.

use crate::model::context::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a note row.
pub type NoteId = Uuid;

/// A keyword the user keeps definitions for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: NoteId,
    /// Normalized unique name.
    pub name: String,
}

impl Note {
    /// Creates a note record with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Body text of one note for one context (or for no context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub note_id: NoteId,
    /// Scope of this definition. `None` is the context-less definition.
    pub context: Option<Context>,
    pub body: String,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

impl Definition {
    /// Context name of this definition, if scoped.
    pub fn context_name(&self) -> Option<&str> {
        self.context.as_ref().map(|context| context.name.as_str())
    }

    /// First line of the body, used by one-line summaries.
    pub fn first_line(&self) -> &str {
        self.body.lines().next().unwrap_or("")
    }
}
