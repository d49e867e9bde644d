//! Save use-case service.
//!
//! # Responsibility
//! - Wrap one save resolution in one store transaction.
//! - Read the buffer snapshot from the edit surface when asked to.
//!
//! # Invariants
//! - Committed saves write all their rows; aborted or failed saves write none.
//! - The transaction is `IMMEDIATE`, so a concurrent writer waits instead of
//!   interleaving with the resolver's lookups.

use crate::model::name::normalize_name;
use crate::repo::note_repo::{NoteStore, SqliteNoteStore};
use crate::save::prompt::EditSurface;
use crate::save::resolver::{Resolver, ResolverConfig};
use crate::save::session::{ActiveContext, SaveOutcome, SaveSession};
use crate::save::SaveError;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Input of one save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRequest {
    pub word: String,
    /// Context argument; empty when none was given.
    pub context: String,
    /// Context the note is currently shown under.
    pub active_context: Option<ActiveContext>,
    pub buffer_lines: Vec<String>,
    /// Answers replayed before any live prompt.
    pub answers: Vec<String>,
}

impl SaveRequest {
    pub fn new(word: impl Into<String>, buffer_lines: Vec<String>) -> Self {
        Self {
            word: word.into(),
            buffer_lines,
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_active_context(mut self, active_context: Option<ActiveContext>) -> Self {
        self.active_context = active_context;
        self
    }

    pub fn with_answers<I, A>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.answers.extend(answers.into_iter().map(Into::into));
        self
    }
}

/// Transactional save facade over a SQLite connection.
pub struct SaveService<'conn> {
    conn: &'conn Connection,
    config: ResolverConfig,
}

impl<'conn> SaveService<'conn> {
    pub fn new(conn: &'conn Connection, config: ResolverConfig) -> Self {
        Self { conn, config }
    }

    /// Resolves and persists `request`.
    ///
    /// Prompts are answered from `request.answers`, then from `surface`.
    pub fn save(
        &self,
        request: SaveRequest,
        surface: Option<&mut dyn EditSurface>,
    ) -> Result<SaveOutcome, SaveError> {
        let started_at = Instant::now();
        let word = normalize_name(&request.word).map_err(SaveError::InvalidWord)?;
        info!("event=save module=service status=start word={word}");

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let result = resolve_in(&tx, &word, request, &self.config, surface);

        match result {
            Ok(outcome) if outcome.is_committed() => {
                tx.commit()?;
                info!(
                    "event=save module=service status=ok word={word} action={:?} created_context={} duration_ms={}",
                    outcome.action,
                    outcome.created_context,
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Ok(outcome) => {
                tx.rollback()?;
                info!(
                    "event=save module=service status=abort word={word} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=save module=service status=error word={word} error_code=rollback_failed error={rollback_err}"
                    );
                }
                error!(
                    "event=save module=service status=error word={word} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Saves the current contents of `surface`.
    pub fn save_buffer(
        &self,
        request: SaveRequest,
        surface: &mut dyn EditSurface,
    ) -> Result<SaveOutcome, SaveError> {
        let buffer_lines = surface.current_buffer_lines()?;
        self.save(
            SaveRequest {
                buffer_lines,
                ..request
            },
            Some(surface),
        )
    }
}

fn resolve_in(
    conn: &Connection,
    word: &str,
    request: SaveRequest,
    config: &ResolverConfig,
    surface: Option<&mut dyn EditSurface>,
) -> Result<SaveOutcome, SaveError> {
    let store = SqliteNoteStore::try_new(conn)?;
    let note = store.find_note(word)?;
    let session = SaveSession::new(word, note, &request.context, &request.buffer_lines)?
        .with_active_context(request.active_context)
        .with_answers(request.answers);
    Resolver::new(&store, session, config.clone()).run(surface)
}
