//! Context domain model.
//!
//! A context is a named scope ("python", "kivy") under which one keyword can
//! carry a definition distinct from its definitions in other scopes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a context row.
pub type ContextId = Uuid;

/// Named scope for definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub uuid: ContextId,
    /// Normalized unique name.
    pub name: String,
    /// Free-text description, empty when the user gave none.
    pub description: String,
}

impl Context {
    /// Creates a context record with a fresh id.
    ///
    /// Callers pass an already normalized name.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
        }
    }
}
