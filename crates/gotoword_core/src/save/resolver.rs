//! Resumable driver over the save state machine.
//!
//! # Responsibility
//! - Run transitions until the save needs input or reaches a terminal state.
//! - Hand out prompts as values so callers can answer them asynchronously.
//! - Offer `run` for callers holding a live edit surface.
//!
//! # Invariants
//! - At most one prompt is outstanding at a time.
//! - Queued answers are consumed before any live prompt.
//! - A finished resolver refuses further input.

use crate::repo::note_repo::NoteStore;
use crate::save::prompt::{ask_surface, EditSurface, Prompt};
use crate::save::session::{SaveOutcome, SaveSession};
use crate::save::state::{transition, SaveState, Transition};
use crate::save::SaveError;
use log::debug;
use serde::Deserialize;

pub const DEFAULT_MAX_PROMPT_ATTEMPTS: u32 = 5;

/// What `Resolver::run` does once queued answers run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedAnswers {
    /// Ask the live surface, if one is attached.
    #[default]
    Prompt,
    /// Fail with `SaveError::AnswersExhausted`.
    Fail,
}

/// Tunables of the save resolver, loaded from the `[resolver]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Invalid answers accepted at one prompt before the save aborts.
    pub max_prompt_attempts: u32,
    /// Ask for a description when a save introduces a new context.
    pub describe_new_contexts: bool,
    pub on_answers_exhausted: ExhaustedAnswers,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_prompt_attempts: DEFAULT_MAX_PROMPT_ATTEMPTS,
            describe_new_contexts: true,
            on_answers_exhausted: ExhaustedAnswers::Prompt,
        }
    }
}

/// Result of advancing the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Waiting for the answer to this prompt.
    NeedInput(Prompt),
    Finished(SaveOutcome),
}

/// Drives one `SaveSession` against a store.
pub struct Resolver<'s, S: NoteStore + ?Sized> {
    store: &'s S,
    session: SaveSession,
    config: ResolverConfig,
    state: SaveState,
    finished: bool,
}

impl<'s, S: NoteStore + ?Sized> Resolver<'s, S> {
    pub fn new(store: &'s S, session: SaveSession, config: ResolverConfig) -> Self {
        Self {
            store,
            session,
            config,
            state: SaveState::Entry,
            finished: false,
        }
    }

    /// Current state; the prompting state while suspended.
    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn session(&self) -> &SaveSession {
        &self.session
    }

    /// Runs from `Entry` until the first prompt or the end.
    pub fn start(&mut self) -> Result<Step, SaveError> {
        self.drive(None)
    }

    /// Answers the outstanding prompt and runs on.
    pub fn resume(&mut self, answer: &str) -> Result<Step, SaveError> {
        if self.finished {
            return Err(SaveError::InconsistentState(
                "resolver already finished".to_string(),
            ));
        }
        self.drive(Some(answer))
    }

    fn drive(&mut self, mut answer: Option<&str>) -> Result<Step, SaveError> {
        loop {
            let next = transition(
                self.state,
                &mut self.session,
                self.store,
                &self.config,
                answer.take(),
            )?;
            match next {
                Transition::Next(state) => {
                    debug!(
                        "event=save_transition module=save from={:?} to={:?}",
                        self.state, state
                    );
                    self.state = state;
                }
                Transition::Ask(prompt) => {
                    debug!(
                        "event=save_prompt module=save state={:?} kind={} attempt={}",
                        self.state, prompt.kind, prompt.attempt
                    );
                    return Ok(Step::NeedInput(prompt));
                }
                Transition::Stop => {
                    self.finished = true;
                    return self.session.outcome().map(Step::Finished);
                }
            }
        }
    }

    /// Runs to completion, answering prompts from the queue and then from
    /// `surface`.
    pub fn run(mut self, mut surface: Option<&mut dyn EditSurface>) -> Result<SaveOutcome, SaveError> {
        let mut step = self.start()?;
        loop {
            let prompt = match step {
                Step::Finished(outcome) => return Ok(outcome),
                Step::NeedInput(prompt) => prompt,
            };

            let answer = match self.session.take_queued_answer() {
                Some(answer) => answer,
                None => match (self.config.on_answers_exhausted, surface.as_deref_mut()) {
                    (ExhaustedAnswers::Prompt, Some(surface)) => ask_surface(surface, &prompt)?,
                    _ => return Err(SaveError::AnswersExhausted(prompt.kind)),
                },
            };
            step = self.resume(&answer)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExhaustedAnswers, Resolver, ResolverConfig, Step};
    use crate::db::open_db_in_memory;
    use crate::model::context::Context;
    use crate::model::note::{Definition, Note};
    use crate::repo::note_repo::{NoteStore, RepoError, RepoResult, SqliteNoteStore};
    use crate::save::prompt::{EditSurface, PromptKind, SurfaceError};
    use crate::save::session::{SaveAction, SaveSession};
    use crate::save::state::SaveState;
    use crate::save::SaveError;

    fn new_session(word: &str, context: &str) -> SaveSession {
        SaveSession::new(word, None, context, &["red green blue".to_string()]).unwrap()
    }

    #[test]
    fn suspends_at_each_prompt_and_resumes() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let mut resolver = Resolver::new(&store, new_session("rgb", ""), ResolverConfig::default());

        let Step::NeedInput(first) = resolver.start().unwrap() else {
            panic!("expected the context choice");
        };
        assert_eq!(first.kind, PromptKind::ContextChoice);
        assert_eq!(resolver.state(), SaveState::AskContext);

        let Step::NeedInput(second) = resolver.resume("1").unwrap() else {
            panic!("expected the context name");
        };
        assert_eq!(second.kind, PromptKind::ContextName);

        let Step::NeedInput(third) = resolver.resume("python").unwrap() else {
            panic!("expected the context description");
        };
        assert_eq!(third.kind, PromptKind::ContextDescription);

        let Step::Finished(outcome) = resolver.resume("programming language").unwrap() else {
            panic!("expected the save to finish");
        };
        assert_eq!(outcome.action, SaveAction::CreateNote);
        assert!(outcome.created_context);
        assert!(resolver.resume("extra").is_err());
    }

    #[test]
    fn run_fails_when_answers_run_out_without_surface() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let session = new_session("rgb", "").with_answers(["1"]);
        let err = Resolver::new(&store, session, ResolverConfig::default())
            .run(None)
            .unwrap_err();
        assert!(matches!(
            err,
            SaveError::AnswersExhausted(PromptKind::ContextName)
        ));
    }

    /// Answers every prompt with "2" and counts how often it was asked.
    #[derive(Default)]
    struct CountingSurface {
        prompts: usize,
    }

    impl EditSurface for CountingSurface {
        fn prompt_choice(
            &mut self,
            _message: &str,
            _options: &[String],
        ) -> Result<String, SurfaceError> {
            self.prompts += 1;
            Ok("2".to_string())
        }

        fn prompt_text(&mut self, _message: &str) -> Result<String, SurfaceError> {
            self.prompts += 1;
            Ok("python".to_string())
        }

        fn current_buffer_lines(&mut self) -> Result<Vec<String>, SurfaceError> {
            Ok(Vec::new())
        }

        fn display_lines(&mut self, _lines: &[String]) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    #[test]
    fn fail_policy_never_asks_the_live_surface() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig {
            on_answers_exhausted: ExhaustedAnswers::Fail,
            ..ResolverConfig::default()
        };
        let mut surface = CountingSurface::default();
        let err = Resolver::new(&store, new_session("rgb", ""), config)
            .run(Some(&mut surface))
            .unwrap_err();
        assert!(matches!(
            err,
            SaveError::AnswersExhausted(PromptKind::ContextChoice)
        ));
        assert_eq!(surface.prompts, 0);
        assert!(store.find_note("rgb").unwrap().is_none());
    }

    #[test]
    fn prompt_policy_falls_back_to_the_live_surface() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let mut surface = CountingSurface::default();
        let outcome = Resolver::new(&store, new_session("rgb", ""), ResolverConfig::default())
            .run(Some(&mut surface))
            .unwrap();
        assert_eq!(outcome.action, SaveAction::CreateNote);
        assert_eq!(surface.prompts, 1);
    }

    struct FailingStore;

    impl FailingStore {
        fn fail<T>() -> RepoResult<T> {
            Err(RepoError::InvalidData("store offline".to_string()))
        }
    }

    impl NoteStore for FailingStore {
        fn find_note(&self, _name: &str) -> RepoResult<Option<Note>> {
            Self::fail()
        }
        fn find_context(&self, _name: &str) -> RepoResult<Option<Context>> {
            Self::fail()
        }
        fn create_note(&self, _name: &str) -> RepoResult<Note> {
            Self::fail()
        }
        fn create_context(&self, _name: &str, _description: &str) -> RepoResult<Context> {
            Self::fail()
        }
        fn find_definition(
            &self,
            _note: &Note,
            _context: Option<&Context>,
        ) -> RepoResult<Option<Definition>> {
            Self::fail()
        }
        fn create_definition(
            &self,
            _note: &Note,
            _context: Option<&Context>,
            _body: &str,
        ) -> RepoResult<Definition> {
            Self::fail()
        }
        fn update_definition(
            &self,
            _note: &Note,
            _context: Option<&Context>,
            _body: &str,
        ) -> RepoResult<()> {
            Self::fail()
        }
        fn list_definitions(&self, _note: &Note) -> RepoResult<Vec<Definition>> {
            Self::fail()
        }
        fn delete_note(&self, _note: &Note) -> RepoResult<()> {
            Self::fail()
        }
        fn delete_context(&self, _context: &Context) -> RepoResult<()> {
            Self::fail()
        }
        fn list_notes(&self) -> RepoResult<Vec<Note>> {
            Self::fail()
        }
        fn list_contexts(&self) -> RepoResult<Vec<Context>> {
            Self::fail()
        }
        fn list_notes_in_context(&self, _context: &Context) -> RepoResult<Vec<Note>> {
            Self::fail()
        }
    }

    #[test]
    fn store_failure_surfaces_as_store_unavailable() {
        let session = new_session("rgb", "").with_answers(["2"]);
        let err = Resolver::new(&FailingStore, session, ResolverConfig::default())
            .run(None)
            .unwrap_err();
        assert!(matches!(err, SaveError::StoreUnavailable(_)));
    }
}
