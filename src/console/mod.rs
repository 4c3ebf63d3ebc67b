//! Line input for the interactive loop.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use rustyline::{error::ReadlineError, DefaultEditor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    Eof,
}

pub trait Console {
    fn read_line(&mut self, prompt: &str) -> Result<Input>;

    /// Reads a user request. Consoles that keep history record these lines only.
    fn read_request(&mut self, prompt: &str) -> Result<Input> {
        self.read_line(prompt)
    }
}

/// Terminal input with editing and history.
pub struct LineEditor {
    editor: DefaultEditor,
}

impl LineEditor {
    pub fn new() -> Result<Self> {
        Ok(Self { editor: DefaultEditor::new()? })
    }
}

impl Console for LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn read_request(&mut self, prompt: &str) -> Result<Input> {
        let input = self.read_line(prompt)?;
        if let Input::Line(line) = &input {
            if !line.trim().is_empty() {
                let _ = self.editor.add_history_entry(line.as_str());
            }
        }
        Ok(input)
    }
}

/// Plain line reads, for piped stdin.
pub struct PipedConsole<R> {
    reader: R,
}

impl<R: BufRead> PipedConsole<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Console for PipedConsole<R> {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        print!("{}", prompt);
        io::stdout().flush().ok();
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            println!();
            return Ok(Input::Eof);
        }
        println!();
        Ok(Input::Line(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
