//! Terminal edit surface: prompts on a line reader, read panel on a writer.

use gotoword_core::save::prompt::SurfaceError;
use gotoword_core::EditSurface;
use std::io::{BufRead, Write};

const INPUT_CLOSED: &str =
    "input closed before an answer was given; pass answers with --answer";

pub struct TerminalSurface<R, W> {
    input: R,
    output: W,
    buffer: Vec<String>,
}

impl<R: BufRead, W: Write> TerminalSurface<R, W> {
    /// `buffer` is the edit buffer handed to saves.
    pub fn new(input: R, output: W, buffer: Vec<String>) -> Self {
        Self {
            input,
            output,
            buffer,
        }
    }

    fn read_answer(&mut self) -> Result<String, SurfaceError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SurfaceError::new(INPUT_CLOSED));
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> EditSurface for TerminalSurface<R, W> {
    fn prompt_choice(&mut self, message: &str, options: &[String]) -> Result<String, SurfaceError> {
        writeln!(self.output, "{message}")?;
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "{}. {option}", index + 1)?;
        }
        write!(self.output, "> ")?;
        self.output.flush()?;
        self.read_answer()
    }

    fn prompt_text(&mut self, message: &str) -> Result<String, SurfaceError> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        self.read_answer()
    }

    fn current_buffer_lines(&mut self) -> Result<Vec<String>, SurfaceError> {
        Ok(self.buffer.clone())
    }

    fn display_lines(&mut self, lines: &[String]) -> Result<(), SurfaceError> {
        for line in lines {
            writeln!(self.output, "{line}")?;
        }
        self.output.flush()?;
        Ok(())
    }
}
