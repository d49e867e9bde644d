//! Save resolver states and their transition function.
//!
//! # Responsibility
//! - Name every step of save resolution as one `SaveState` variant.
//! - Compute the next step from `(state, session, store, answer)`.
//!
//! # Invariants
//! - Prompt states never consume input they did not ask for: entered with no
//!   answer they emit `Transition::Ask`, entered with one they evaluate it.
//! - A context is written to the store before any definition referencing it.
//! - Terminal states set `session.action` and return `Transition::Stop`.

use crate::model::context::Context;
use crate::model::name::normalize_name;
use crate::model::note::Note;
use crate::repo::note_repo::{NoteStore, RepoError};
use crate::save::prompt::{ContextChoice, Prompt, BLANK_NAME_HINT, INVALID_CHOICE_HINT};
use crate::save::resolver::ResolverConfig;
use crate::save::session::{ActiveContext, ResolvedContext, SaveAction, SaveSession};
use crate::save::SaveError;
use log::{debug, info, warn};
use serde::Serialize;

/// Label used for the context-less definition in listings and errors.
pub const NO_CONTEXT_LABEL: &str = "(no context)";

/// Named step of save resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    Entry,
    AskContext,
    NameContext,
    DescribeContext,
    CreateNote,
    UpdateDefinition,
}

/// What the resolver does after evaluating one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Continue with another state without user input.
    Next(SaveState),
    /// Suspend until the prompt is answered; the state stays the same.
    Ask(Prompt),
    /// `session.action` is final.
    Stop,
}

/// Evaluates `state` for `session`.
///
/// `answer` is the reply to the prompt this state emitted last time, if any.
pub fn transition<S: NoteStore + ?Sized>(
    state: SaveState,
    session: &mut SaveSession,
    store: &S,
    config: &ResolverConfig,
    answer: Option<&str>,
) -> Result<Transition, SaveError> {
    match state {
        SaveState::Entry => entry(session, store, config),
        SaveState::AskContext => ask_context(session, config, answer),
        SaveState::NameContext => name_context(session, store, config, answer),
        SaveState::DescribeContext => describe_context(session, store, answer),
        SaveState::CreateNote => create_note(session, store),
        SaveState::UpdateDefinition => update_definition(session, store),
    }
}

fn entry<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
    config: &ResolverConfig,
) -> Result<Transition, SaveError> {
    let has_note = session.note().is_some();
    let context_arg = session.context_arg().to_string();
    debug!(
        "event=save_entry module=save word={} note_exists={} context_arg={}",
        session.word(),
        has_note,
        context_arg
    );

    match (has_note, context_arg.is_empty()) {
        (false, true) => Ok(Transition::Next(SaveState::AskContext)),
        (false, false) => {
            let resolved = lookup_context(store, &context_arg)?;
            Ok(route_resolved(
                session,
                config,
                resolved,
                SaveState::CreateNote,
            ))
        }
        (true, true) => {
            let resolved = resolve_active_context(session, store)?;
            Ok(route_resolved(
                session,
                config,
                resolved,
                SaveState::UpdateDefinition,
            ))
        }
        (true, false) => {
            let resolved = lookup_context(store, &context_arg)?;
            Ok(route_resolved(
                session,
                config,
                resolved,
                SaveState::UpdateDefinition,
            ))
        }
    }
}

fn ask_context(
    session: &mut SaveSession,
    config: &ResolverConfig,
    answer: Option<&str>,
) -> Result<Transition, SaveError> {
    let Some(answer) = answer else {
        return Ok(Transition::Ask(Prompt::context_choice(
            session.attempts + 1,
            None,
        )));
    };

    match ContextChoice::parse(answer) {
        Some(ContextChoice::Provide) => {
            session.attempts = 0;
            Ok(Transition::Next(SaveState::NameContext))
        }
        Some(ContextChoice::NoContext) => {
            session.resolve(ResolvedContext::NoContext);
            Ok(Transition::Next(SaveState::CreateNote))
        }
        Some(ContextChoice::Abort) => {
            info!(
                "event=save_abort module=save word={} state=ask_context",
                session.word()
            );
            session.finish(SaveAction::Abort);
            Ok(Transition::Stop)
        }
        None => Ok(retry_or_abort(
            session,
            config,
            SaveState::AskContext,
            |attempt| Prompt::context_choice(attempt, Some(INVALID_CHOICE_HINT)),
        )),
    }
}

fn name_context<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
    config: &ResolverConfig,
    answer: Option<&str>,
) -> Result<Transition, SaveError> {
    let Some(answer) = answer else {
        return Ok(Transition::Ask(Prompt::context_name(
            session.attempts + 1,
            None,
        )));
    };

    let Ok(name) = normalize_name(answer) else {
        return Ok(retry_or_abort(
            session,
            config,
            SaveState::NameContext,
            |attempt| Prompt::context_name(attempt, Some(BLANK_NAME_HINT)),
        ));
    };

    let resolved = lookup_context(store, &name)?;
    Ok(route_resolved(
        session,
        config,
        resolved,
        SaveState::CreateNote,
    ))
}

fn describe_context<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
    answer: Option<&str>,
) -> Result<Transition, SaveError> {
    let Some(name) = session.pending_context_name().map(str::to_string) else {
        return Err(SaveError::InconsistentState(
            "describe_context entered without a pending context".to_string(),
        ));
    };
    let Some(description) = answer else {
        return Ok(Transition::Ask(Prompt::context_description(&name)));
    };

    let context = create_or_reuse_context(session, store, &name, description)?;
    session.resolve(ResolvedContext::Existing(context));

    if session.note().is_some() {
        Ok(Transition::Next(SaveState::UpdateDefinition))
    } else {
        Ok(Transition::Next(SaveState::CreateNote))
    }
}

fn create_note<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
) -> Result<Transition, SaveError> {
    let context = materialize_context(session, store)?;

    let note = match store.create_note(session.word()) {
        Ok(note) => note,
        Err(RepoError::Duplicate { .. }) => {
            let existing = find_existing_note(store, session.word())?;
            warn!(
                "event=note_create module=save status=reused word={}",
                session.word()
            );
            session.note = Some(existing);
            return Ok(Transition::Next(SaveState::UpdateDefinition));
        }
        Err(err) => return Err(err.into()),
    };

    store.create_definition(&note, context.as_ref(), session.body())?;
    info!(
        "event=note_create module=save status=ok word={} context={}",
        note.name,
        context_label(context.as_ref())
    );
    session.note = Some(note);
    session.finish(SaveAction::CreateNote);
    Ok(Transition::Stop)
}

fn update_definition<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
) -> Result<Transition, SaveError> {
    let context = materialize_context(session, store)?;
    let note = session.note().cloned().ok_or_else(|| {
        SaveError::InconsistentState("update_definition entered without a note".to_string())
    })?;

    let action = match store.find_definition(&note, context.as_ref())? {
        Some(existing) => {
            if existing.body == session.body() {
                debug!(
                    "event=definition_update module=save status=unchanged word={} context={}",
                    note.name,
                    context_label(context.as_ref())
                );
            } else {
                store.update_definition(&note, context.as_ref(), session.body())?;
            }
            SaveAction::UpdateDefinition
        }
        None => match store.create_definition(&note, context.as_ref(), session.body()) {
            Ok(_) => SaveAction::AttachDefinition,
            Err(RepoError::Duplicate { .. }) => {
                store.update_definition(&note, context.as_ref(), session.body())?;
                SaveAction::UpdateDefinition
            }
            Err(err) => return Err(err.into()),
        },
    };

    info!(
        "event=definition_save module=save status=ok word={} context={} action={:?}",
        note.name,
        context_label(context.as_ref()),
        action
    );
    session.finish(action);
    Ok(Transition::Stop)
}

/// Routes a freshly resolved context to `target`, through `DescribeContext`
/// when the context is new and descriptions are prompted for.
fn route_resolved(
    session: &mut SaveSession,
    config: &ResolverConfig,
    resolved: ResolvedContext,
    target: SaveState,
) -> Transition {
    let describe = resolved.is_new() && config.describe_new_contexts;
    session.resolve(resolved);
    if describe {
        Transition::Next(SaveState::DescribeContext)
    } else {
        Transition::Next(target)
    }
}

fn retry_or_abort(
    session: &mut SaveSession,
    config: &ResolverConfig,
    state: SaveState,
    prompt: impl FnOnce(u32) -> Prompt,
) -> Transition {
    session.attempts += 1;
    if session.attempts >= config.max_prompt_attempts {
        warn!(
            "event=save_abort module=save word={} state={:?} reason=invalid_answers attempts={}",
            session.word(),
            state,
            session.attempts
        );
        session.finish(SaveAction::Abort);
        return Transition::Stop;
    }
    Transition::Ask(prompt(session.attempts + 1))
}

fn lookup_context<S: NoteStore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<ResolvedContext, SaveError> {
    match store.find_context(name)? {
        Some(context) => Ok(ResolvedContext::Existing(context)),
        None => Ok(ResolvedContext::New {
            name: normalize_name(name).map_err(SaveError::InvalidContextName)?,
            description: String::new(),
        }),
    }
}

fn resolve_active_context<S: NoteStore + ?Sized>(
    session: &SaveSession,
    store: &S,
) -> Result<ResolvedContext, SaveError> {
    match session.active_context() {
        Some(ActiveContext::NoContext) => return Ok(ResolvedContext::NoContext),
        Some(ActiveContext::Named(name)) => return lookup_context(store, name),
        None => {}
    }

    let note = session.note().ok_or_else(|| {
        SaveError::InconsistentState("active context requested without a note".to_string())
    })?;
    let definitions = store.list_definitions(note)?;
    match definitions.as_slice() {
        [] => Ok(ResolvedContext::NoContext),
        [only] => Ok(only
            .context
            .clone()
            .map_or(ResolvedContext::NoContext, ResolvedContext::Existing)),
        many => Err(SaveError::AmbiguousContext {
            note: note.name.clone(),
            contexts: many
                .iter()
                .map(|definition| {
                    definition
                        .context_name()
                        .unwrap_or(NO_CONTEXT_LABEL)
                        .to_string()
                })
                .collect(),
        }),
    }
}

/// Turns the resolved context into a stored one, creating it when new.
fn materialize_context<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
) -> Result<Option<Context>, SaveError> {
    match session.resolved_context().cloned() {
        Some(ResolvedContext::NoContext) => Ok(None),
        Some(ResolvedContext::Existing(context)) => Ok(Some(context)),
        Some(ResolvedContext::New { name, description }) => {
            let context = create_or_reuse_context(session, store, &name, &description)?;
            session.resolve(ResolvedContext::Existing(context.clone()));
            Ok(Some(context))
        }
        None => Err(SaveError::InconsistentState(
            "definition write reached without a resolved context".to_string(),
        )),
    }
}

fn create_or_reuse_context<S: NoteStore + ?Sized>(
    session: &mut SaveSession,
    store: &S,
    name: &str,
    description: &str,
) -> Result<Context, SaveError> {
    match store.create_context(name, description) {
        Ok(context) => {
            info!("event=context_create module=save status=ok context={name}");
            session.mark_context_created();
            Ok(context)
        }
        Err(RepoError::Duplicate { .. }) => {
            warn!("event=context_create module=save status=reused context={name}");
            store.find_context(name)?.ok_or_else(|| {
                SaveError::InconsistentState(format!(
                    "context `{name}` reported duplicate but cannot be found"
                ))
            })
        }
        Err(err) => Err(err.into()),
    }
}

fn find_existing_note<S: NoteStore + ?Sized>(store: &S, word: &str) -> Result<Note, SaveError> {
    store.find_note(word)?.ok_or_else(|| {
        SaveError::InconsistentState(format!(
            "note `{word}` reported duplicate but cannot be found"
        ))
    })
}

fn context_label(context: Option<&Context>) -> &str {
    context.map_or(NO_CONTEXT_LABEL, |context| context.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::{transition, SaveState, Transition};
    use crate::db::open_db_in_memory;
    use crate::repo::note_repo::{NoteStore, SqliteNoteStore};
    use crate::save::prompt::PromptKind;
    use crate::save::resolver::ResolverConfig;
    use crate::save::session::{ActiveContext, ResolvedContext, SaveAction, SaveSession};
    use crate::save::SaveError;

    fn session(store: &SqliteNoteStore<'_>, word: &str, context: &str) -> SaveSession {
        let note = store.find_note(word).unwrap();
        SaveSession::new(word, note, context, &["body".to_string()]).unwrap()
    }

    #[test]
    fn entry_routes_every_lookup_combination() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();
        let note = store.create_note("known").unwrap();
        let kivy = store.create_context("kivy", "").unwrap();
        store.create_definition(&note, Some(&kivy), "old").unwrap();

        let cases = [
            ("fresh", "", SaveState::AskContext),
            ("fresh", "kivy", SaveState::CreateNote),
            ("fresh", "python", SaveState::DescribeContext),
            ("known", "", SaveState::UpdateDefinition),
            ("known", "kivy", SaveState::UpdateDefinition),
            ("known", "python", SaveState::DescribeContext),
        ];
        for (word, context, expected) in cases {
            let mut session = session(&store, word, context);
            let next = transition(SaveState::Entry, &mut session, &store, &config, None).unwrap();
            assert_eq!(next, Transition::Next(expected), "{word}/{context}");
        }
    }

    #[test]
    fn new_context_skips_description_when_disabled() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig {
            describe_new_contexts: false,
            ..ResolverConfig::default()
        };
        let mut session = session(&store, "fresh", "python");
        let next = transition(SaveState::Entry, &mut session, &store, &config, None).unwrap();
        assert_eq!(next, Transition::Next(SaveState::CreateNote));
        assert!(session.create_context());
    }

    #[test]
    fn ask_context_maps_each_choice() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();

        let mut asking = session(&store, "fresh", "");
        match transition(SaveState::AskContext, &mut asking, &store, &config, None).unwrap() {
            Transition::Ask(prompt) => assert_eq!(prompt.kind, PromptKind::ContextChoice),
            other => panic!("expected prompt, got {other:?}"),
        }

        let mut provide = session(&store, "fresh", "");
        let next =
            transition(SaveState::AskContext, &mut provide, &store, &config, Some("1")).unwrap();
        assert_eq!(next, Transition::Next(SaveState::NameContext));

        let mut none = session(&store, "fresh", "");
        let next = transition(SaveState::AskContext, &mut none, &store, &config, Some("2")).unwrap();
        assert_eq!(next, Transition::Next(SaveState::CreateNote));
        assert_eq!(none.resolved_context(), Some(&ResolvedContext::NoContext));

        let mut abort = session(&store, "fresh", "");
        let next = transition(SaveState::AskContext, &mut abort, &store, &config, Some("3")).unwrap();
        assert_eq!(next, Transition::Stop);
        assert_eq!(abort.action(), Some(SaveAction::Abort));
    }

    #[test]
    fn invalid_choices_abort_after_configured_attempts() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig {
            max_prompt_attempts: 2,
            ..ResolverConfig::default()
        };
        let mut session = session(&store, "fresh", "");

        match transition(SaveState::AskContext, &mut session, &store, &config, Some("9")).unwrap() {
            Transition::Ask(prompt) => {
                assert_eq!(prompt.attempt, 2);
                assert!(prompt.hint.is_some());
            }
            other => panic!("expected re-prompt, got {other:?}"),
        }
        let last = transition(SaveState::AskContext, &mut session, &store, &config, Some("9")).unwrap();
        assert_eq!(last, Transition::Stop);
        assert_eq!(session.action(), Some(SaveAction::Abort));
    }

    #[test]
    fn blank_context_name_is_retried() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();
        let mut session = session(&store, "fresh", "");

        match transition(SaveState::NameContext, &mut session, &store, &config, Some("  ")).unwrap() {
            Transition::Ask(prompt) => assert_eq!(prompt.kind, PromptKind::ContextName),
            other => panic!("expected re-prompt, got {other:?}"),
        }
        let next =
            transition(SaveState::NameContext, &mut session, &store, &config, Some("Python"))
                .unwrap();
        assert_eq!(next, Transition::Next(SaveState::DescribeContext));
    }

    #[test]
    fn describe_context_creates_context_before_note() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();
        let mut session = session(&store, "fresh", "python");

        transition(SaveState::Entry, &mut session, &store, &config, None).unwrap();
        let next = transition(
            SaveState::DescribeContext,
            &mut session,
            &store,
            &config,
            Some("programming language"),
        )
        .unwrap();
        assert_eq!(next, Transition::Next(SaveState::CreateNote));

        let context = store.find_context("python").unwrap().unwrap();
        assert_eq!(context.description, "programming language");
        assert!(store.find_note("fresh").unwrap().is_none());
    }

    #[test]
    fn update_definition_attaches_or_overwrites() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();
        let note = store.create_note("known").unwrap();
        store.create_definition(&note, None, "old").unwrap();
        store.create_context("kivy", "").unwrap();

        let mut overwrite = session(&store, "known", "");
        transition(SaveState::Entry, &mut overwrite, &store, &config, None).unwrap();
        transition(SaveState::UpdateDefinition, &mut overwrite, &store, &config, None).unwrap();
        assert_eq!(overwrite.action(), Some(SaveAction::UpdateDefinition));

        let mut attach = session(&store, "known", "kivy");
        transition(SaveState::Entry, &mut attach, &store, &config, None).unwrap();
        transition(SaveState::UpdateDefinition, &mut attach, &store, &config, None).unwrap();
        assert_eq!(attach.action(), Some(SaveAction::AttachDefinition));

        let bodies: Vec<String> = store
            .list_definitions(&note)
            .unwrap()
            .into_iter()
            .map(|definition| definition.body)
            .collect();
        assert_eq!(bodies, vec!["body".to_string(), "body".to_string()]);
    }

    #[test]
    fn several_definitions_without_active_context_are_ambiguous() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let config = ResolverConfig::default();
        let note = store.create_note("known").unwrap();
        let kivy = store.create_context("kivy", "").unwrap();
        store.create_definition(&note, None, "plain").unwrap();
        store.create_definition(&note, Some(&kivy), "kv").unwrap();

        let mut session = session(&store, "known", "");
        let err = transition(SaveState::Entry, &mut session, &store, &config, None).unwrap_err();
        match err {
            SaveError::AmbiguousContext { note, contexts } => {
                assert_eq!(note, "known");
                assert_eq!(contexts.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }

        let mut chosen = self::session(&store, "known", "")
            .with_active_context(Some(ActiveContext::Named("kivy".to_string())));
        let next = transition(SaveState::Entry, &mut chosen, &store, &config, None).unwrap();
        assert_eq!(next, Transition::Next(SaveState::UpdateDefinition));
        assert_eq!(
            chosen.resolved_context(),
            Some(&ResolvedContext::Existing(kivy))
        );
    }
}
