//! Name normalization for notes and contexts.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected note or context name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty after trimming.
    Blank,
    /// Name spans several lines; names come from single-line prompts.
    Multiline(String),
}

impl Display for NameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "name cannot be blank"),
            Self::Multiline(value) => write!(f, "name must be a single line: `{value}`"),
        }
    }
}

impl Error for NameError {}

/// Normalizes one note or context name.
///
/// Trims surrounding whitespace and lowercases, so `" RGB "` and `"rgb"`
/// address the same note.
pub fn normalize_name(raw: &str) -> Result<String, NameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameError::Blank);
    }
    if trimmed.contains(['\n', '\r']) {
        return Err(NameError::Multiline(trimmed.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, NameError};

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Kivy ").unwrap(), "kivy");
        assert_eq!(normalize_name("functional tests").unwrap(), "functional tests");
    }

    #[test]
    fn normalize_rejects_blank_and_multiline() {
        assert_eq!(normalize_name("   ").unwrap_err(), NameError::Blank);
        assert!(matches!(
            normalize_name("a\nb").unwrap_err(),
            NameError::Multiline(_)
        ));
    }
}
