//! Word-under-cursor extraction.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Returns the lowercased word at character `column` of `line`.
///
/// When the cursor sits between words, the next word on the line is taken.
/// Returns `None` when no word starts at or after the cursor.
pub fn word_at(line: &str, column: usize) -> Option<String> {
    let byte_column = line
        .char_indices()
        .nth(column)
        .map_or(line.len(), |(index, _)| index);

    WORD_RE
        .find_iter(line)
        .find(|found| found.end() > byte_column)
        .map(|found| found.as_str().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::word_at;

    #[test]
    fn picks_word_under_cursor() {
        assert_eq!(word_at("use Kivy canvas", 5).as_deref(), Some("kivy"));
        assert_eq!(word_at("use Kivy canvas", 4).as_deref(), Some("kivy"));
        assert_eq!(word_at("use Kivy canvas", 7).as_deref(), Some("kivy"));
    }

    #[test]
    fn falls_forward_from_whitespace() {
        assert_eq!(word_at("rgb   value", 4).as_deref(), Some("value"));
    }

    #[test]
    fn none_past_last_word() {
        assert_eq!(word_at("rgb  ", 4), None);
        assert_eq!(word_at("", 0), None);
    }

    #[test]
    fn columns_count_characters() {
        assert_eq!(word_at("é rgb", 2).as_deref(), Some("rgb"));
    }
}
