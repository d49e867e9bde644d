//! `gotoword` command line entry point.
//!
//! # Responsibility
//! - Map subcommands onto the core save and read-panel services.
//! - Drive interactive prompts on the terminal.
//! - Resolve an ambiguous save by asking which definition to update.
//!
//! # Invariants
//! - A definition piped on stdin never doubles as prompt input; prompts then
//!   read from the controlling terminal.

mod surface;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gotoword_core::config::{load_config, Config};
use gotoword_core::db::Connection;
use gotoword_core::service::{cursor, panel};
use gotoword_core::{
    init_from_config, open_db, ActiveContext, Definition, EditSurface, NoteService, SaveAction,
    SaveError, SaveOutcome, SaveRequest, SaveService, SqliteNoteStore,
};
use log::warn;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use surface::TerminalSurface;

const CONTROLLING_TERMINAL: &str = "/dev/tty";

type Terminal = TerminalSurface<Box<dyn BufRead>, io::Stdout>;

#[derive(Parser)]
#[command(name = "gotoword")]
#[command(about = "Keep per-context definitions of the words you look up")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $GOTOWORD_CONFIG, then ./gotoword.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keyword database, overriding `database.path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a definition for a word
    Save {
        word: String,

        /// Context the definition belongs to
        #[arg(short, long)]
        context: Option<String>,

        /// Context the note is currently shown under (`-` for no context)
        #[arg(long)]
        active_context: Option<String>,

        /// Read the definition from a file instead of stdin; with stdin,
        /// prompts are answered on the terminal
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Answer for the next prompt; repeat for several prompts
        #[arg(short, long = "answer")]
        answers: Vec<String>,
    },
    /// Show the stored definition of a word
    Show {
        word: String,

        #[arg(short, long)]
        context: Option<String>,
    },
    /// Print the word at a 0-based character column of a line
    WordAt { line: String, column: usize },
    /// Delete a word and all its definitions
    Delete { word: String },
    /// Delete a context and the definitions in it
    DeleteContext { name: String },
    /// List every stored word
    Words,
    /// List every context with its description
    Contexts,
    /// List the words defined in a context
    ContextWords { name: String },
    /// List the contexts a word is defined in
    WordContexts { word: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::WordAt { line, column } = &cli.command {
        if let Some(word) = cursor::word_at(line, *column) {
            println!("{word}");
        }
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    if let Err(err) = init_from_config(&config.logging) {
        eprintln!("warning: logging disabled: {err}");
    }
    let db_path = cli.db.clone().unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)
        .with_context(|| format!("cannot open keyword database `{}`", db_path.display()))?;

    match cli.command {
        Commands::Save {
            word,
            context,
            active_context,
            file,
            answers,
        } => {
            let buffer = read_buffer(file.as_deref())?;
            let input = prompt_input(file.is_none());
            let mut surface = TerminalSurface::new(input, io::stdout(), buffer);
            let request = SaveRequest::new(word, Vec::new())
                .with_context(context.unwrap_or_default())
                .with_active_context(active_context.as_deref().map(parse_active_context))
                .with_answers(answers);
            let outcome = save_with_disambiguation(&conn, &config, request, &mut surface)?;
            print_outcome(&outcome);
        }
        Commands::Show { word, context } => {
            let lines = notes(&conn)?.panel_lines(&word, context.as_deref())?;
            display(&lines)?;
        }
        Commands::WordAt { .. } => {}
        Commands::Delete { word } => {
            let note = notes(&conn)?.delete_note(&word)?;
            println!("deleted keyword `{}`", note.name);
        }
        Commands::DeleteContext { name } => {
            let context = notes(&conn)?.delete_context(&name)?;
            println!("deleted context `{}`", context.name);
        }
        Commands::Words => display(&panel::render_words(&notes(&conn)?.all_words()?))?,
        Commands::Contexts => display(&panel::render_contexts(&notes(&conn)?.all_contexts()?))?,
        Commands::ContextWords { name } => {
            let (context, words) = notes(&conn)?.context_words(&name)?;
            display(&panel::render_context_words(&context, &words))?;
        }
        Commands::WordContexts { word } => {
            let (note, definitions) = notes(&conn)?.word_contexts(&word)?;
            display(&panel::render_word_contexts(&note, &definitions))?;
        }
    }
    Ok(())
}

fn notes(conn: &Connection) -> Result<NoteService<SqliteNoteStore<'_>>> {
    Ok(NoteService::new(SqliteNoteStore::try_new(conn)?))
}

fn display(lines: &[String]) -> Result<()> {
    let mut surface: Terminal =
        TerminalSurface::new(Box::new(io::empty()), io::stdout(), Vec::new());
    surface.display_lines(lines)?;
    Ok(())
}

/// Reader for prompt answers: stdin, or the controlling terminal when stdin
/// carried the definition.
fn prompt_input(buffer_from_stdin: bool) -> Box<dyn BufRead> {
    prompt_input_with(buffer_from_stdin, || File::open(CONTROLLING_TERMINAL))
}

fn prompt_input_with(
    buffer_from_stdin: bool,
    open_terminal: impl FnOnce() -> io::Result<File>,
) -> Box<dyn BufRead> {
    if !buffer_from_stdin {
        return Box::new(io::stdin().lock());
    }
    match open_terminal() {
        Ok(terminal) => Box::new(BufReader::new(terminal)),
        Err(err) => {
            warn!("event=prompt_input module=cli status=no_terminal error={err}");
            Box::new(io::empty())
        }
    }
}

/// Saves `request`, asking which definition to update when the note has
/// several.
fn save_with_disambiguation(
    conn: &Connection,
    config: &Config,
    request: SaveRequest,
    surface: &mut dyn EditSurface,
) -> Result<SaveOutcome> {
    let service = SaveService::new(conn, config.resolver.clone());

    let note = match service.save_buffer(request.clone(), surface) {
        Err(SaveError::AmbiguousContext { note, .. }) => note,
        other => return Ok(other?),
    };
    warn!("event=save module=cli status=ambiguous word={note}");

    let (_, definitions) = notes(conn)?.word_contexts(&note)?;
    let options: Vec<String> = definitions
        .iter()
        .map(|definition| context_label(definition).to_string())
        .collect();
    let message = format!("`{note}` has several definitions. Which one do you update?");
    let answer = surface.prompt_choice(&message, &options)?;
    let Some(chosen) = pick_definition(&answer, &definitions) else {
        bail!("`{}` is not one of the listed contexts", answer.trim());
    };
    let active = match &chosen.context {
        Some(context) => ActiveContext::Named(context.name.clone()),
        None => ActiveContext::NoContext,
    };
    Ok(service.save_buffer(request.with_active_context(Some(active)), surface)?)
}

fn context_label(definition: &Definition) -> &str {
    definition.context_name().unwrap_or(panel::NO_CONTEXT_LABEL)
}

/// Accepts a 1-based option number, a context name, or `-` / `(no context)`
/// for the context-less definition.
fn pick_definition<'a>(answer: &str, definitions: &'a [Definition]) -> Option<&'a Definition> {
    let answer = answer.trim();
    if let Ok(number) = answer.parse::<usize>() {
        return number.checked_sub(1).and_then(|index| definitions.get(index));
    }
    let named = definitions.iter().find(|definition| {
        definition
            .context_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(answer))
    });
    if named.is_some() {
        return named;
    }
    if answer == "-" || answer == panel::NO_CONTEXT_LABEL {
        return definitions.iter().find(|definition| definition.context.is_none());
    }
    None
}

fn parse_active_context(value: &str) -> ActiveContext {
    let value = value.trim();
    if value.is_empty() || value == "-" || value == panel::NO_CONTEXT_LABEL {
        ActiveContext::NoContext
    } else {
        ActiveContext::Named(value.to_string())
    }
}

fn read_buffer(file: Option<&Path>) -> Result<Vec<String>> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read definition from `{}`", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut text)
                .context("cannot read definition from stdin")?;
            text
        }
    };
    Ok(text.lines().map(str::to_string).collect())
}

fn print_outcome(outcome: &SaveOutcome) {
    let word = outcome.note.as_ref().map_or("", |note| note.name.as_str());
    let context = outcome
        .context
        .as_ref()
        .map_or(panel::NO_CONTEXT_LABEL, |context| context.name.as_str());
    match outcome.action {
        SaveAction::Abort => println!("save aborted, nothing written"),
        action => println!("{action:?}: `{word}` in {context}"),
    }
}
