//! Prompt requests emitted by the save resolver and the surfaces answering them.
//!
//! # Responsibility
//! - Describe each piece of user input the resolver can wait for.
//! - Define the edit-surface contract (prompts, buffer lines, read panel).
//! - Parse the numbered context choice.
//!
//! # Invariants
//! - A prompt with `options` is answered by a numbered choice; a prompt
//!   without options is answered by one line of free text.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CONTEXT_CHOICE_MESSAGE: &str =
    "Do you want to specify a context that this definition of the word applies in?";
pub const CONTEXT_CHOICE_OPTIONS: [&str; 3] = [
    "Yes, I will provide a context",
    "No, I won't provide a context",
    "Abort",
];
pub const CONTEXT_NAME_MESSAGE: &str = "Enter a context name: ";
pub const INVALID_CHOICE_HINT: &str = "Invalid option! Type a number from 1 to 3";
pub const BLANK_NAME_HINT: &str = "A context name cannot be blank or span several lines";

/// Which piece of input a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Provide a context, use no context, or abort.
    ContextChoice,
    /// Name of the context the definition belongs to.
    ContextName,
    /// Description of a context about to be created.
    ContextDescription,
}

impl Display for PromptKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextChoice => write!(f, "context_choice"),
            Self::ContextName => write!(f, "context_name"),
            Self::ContextDescription => write!(f, "context_description"),
        }
    }
}

/// One suspension point of the save resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub kind: PromptKind,
    pub message: String,
    /// Numbered options, empty for free-text prompts.
    pub options: Vec<String>,
    /// 1-based attempt counter for this prompt.
    pub attempt: u32,
    /// Set after an invalid answer.
    pub hint: Option<String>,
}

impl Prompt {
    pub fn context_choice(attempt: u32, hint: Option<&str>) -> Self {
        Self {
            kind: PromptKind::ContextChoice,
            message: CONTEXT_CHOICE_MESSAGE.to_string(),
            options: CONTEXT_CHOICE_OPTIONS
                .iter()
                .map(|option| option.to_string())
                .collect(),
            attempt,
            hint: hint.map(str::to_string),
        }
    }

    pub fn context_name(attempt: u32, hint: Option<&str>) -> Self {
        Self {
            kind: PromptKind::ContextName,
            message: CONTEXT_NAME_MESSAGE.to_string(),
            options: Vec::new(),
            attempt,
            hint: hint.map(str::to_string),
        }
    }

    pub fn context_description(context_name: &str) -> Self {
        Self {
            kind: PromptKind::ContextDescription,
            message: format!(
                "Enter a short description of the context `{context_name}` you just defined: "
            ),
            options: Vec::new(),
            attempt: 1,
            hint: None,
        }
    }

    /// Whether the prompt expects a numbered choice.
    pub fn is_choice(&self) -> bool {
        !self.options.is_empty()
    }

    /// Message with the retry hint prepended, as shown to the user.
    pub fn display_message(&self) -> String {
        match self.hint.as_deref() {
            Some(hint) => format!("{hint}\n{}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Parsed answer to the context choice prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextChoice {
    Provide,
    NoContext,
    Abort,
}

impl ContextChoice {
    /// Parses a raw answer: `1`/`y...`, `2`/`n...`, `3`/`a...`.
    ///
    /// Returns `None` for anything else, which the resolver re-prompts.
    pub fn parse(answer: &str) -> Option<Self> {
        let answer = answer.trim().to_lowercase();
        if answer == "1" || answer.starts_with('y') {
            Some(Self::Provide)
        } else if answer.starts_with('2') || answer.starts_with('n') {
            Some(Self::NoContext)
        } else if answer.starts_with('3') || answer.starts_with('a') {
            Some(Self::Abort)
        } else {
            None
        }
    }
}

/// Failure reported by an edit surface (closed input, broken terminal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceError {
    message: String,
}

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "edit surface error: {}", self.message)
    }
}

impl Error for SurfaceError {}

impl From<std::io::Error> for SurfaceError {
    fn from(value: std::io::Error) -> Self {
        Self::new(value.to_string())
    }
}

/// Editor-side collaborator: the buffer being edited, prompts and the read
/// panel.
pub trait EditSurface {
    /// Shows `message` with numbered `options` and returns the raw selection.
    fn prompt_choice(&mut self, message: &str, options: &[String]) -> Result<String, SurfaceError>;
    /// Shows `message` and returns one line of free text.
    fn prompt_text(&mut self, message: &str) -> Result<String, SurfaceError>;
    /// Current contents of the edit buffer, one entry per line.
    fn current_buffer_lines(&mut self) -> Result<Vec<String>, SurfaceError>;
    /// Replaces the read panel contents.
    fn display_lines(&mut self, lines: &[String]) -> Result<(), SurfaceError>;
}

/// Asks `prompt` on a live surface.
pub fn ask_surface(surface: &mut dyn EditSurface, prompt: &Prompt) -> Result<String, SurfaceError> {
    let message = prompt.display_message();
    if prompt.is_choice() {
        surface.prompt_choice(&message, &prompt.options)
    } else {
        surface.prompt_text(&message)
    }
}
