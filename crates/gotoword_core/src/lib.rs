//! Core of gotoword: a keyword store with per-context definitions and the
//! resolver deciding where an edited definition is saved.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod save;
pub mod service;

pub use config::{load_config, Config, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::context::Context;
pub use model::note::{Definition, Note};
pub use repo::note_repo::{NoteStore, RepoError, RepoResult, SqliteNoteStore};
pub use save::{
    ActiveContext, EditSurface, Prompt, Resolver, ResolverConfig, SaveAction, SaveError,
    SaveOutcome, SaveSession, Step,
};
pub use service::note_service::{NoteService, NoteServiceError, NoteView};
pub use service::save_service::{SaveRequest, SaveService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
