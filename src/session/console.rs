//! Operator console abstraction.
//!
//! The session talks to the operator through `Console`, so the same loop runs
//! on a terminal or against a scripted list of answers.

use crate::error::{ReportError, Result};
use crossterm::style::{style, Stylize};
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

/// Line-oriented operator input and output.
pub trait Console {
    /// Shows `prompt` and reads one line without its line terminator.
    ///
    /// Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Prints an informational line.
    fn print(&mut self, line: &str);

    /// Prints a line announcing a successful step.
    fn success(&mut self, line: &str) {
        self.print(line);
    }

    /// Prints a line reporting a failed step.
    fn error(&mut self, line: &str) {
        self.print(line);
    }
}

/// Console on the process's stdin and stdout.
#[derive(Debug)]
pub struct StdConsole {
    styled: bool,
}

impl StdConsole {
    /// Creates a console; output is colored when stdout is a terminal.
    pub fn new() -> Self {
        Self {
            styled: io::stdout().is_terminal(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")
            .and_then(|()| stdout.flush())
            .map_err(|e| ReportError::io(format!("Failed to write prompt: {e}")))?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| ReportError::io(format!("Failed to read input: {e}")))?;

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(line)))
    }

    fn print(&mut self, line: &str) {
        println!("{line}");
    }

    fn success(&mut self, line: &str) {
        if self.styled {
            println!("{}", style(line).green().bold());
        } else {
            println!("{line}");
        }
    }

    fn error(&mut self, line: &str) {
        if self.styled {
            println!("{}", style(line).red());
        } else {
            println!("{line}");
        }
    }
}

fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// Console fed from a fixed list of answers, recording everything shown.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedConsole {
    /// Creates a console that answers prompts with `inputs`, in order.
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Lines shown so far; prompts include the answer given.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Returns true if any shown line contains `text`.
    pub fn shows(&self, text: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(text))
    }

    /// Number of answers not yet consumed.
    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let answer = self.inputs.pop_front();
        self.transcript
            .push(format!("{prompt}{}", answer.as_deref().unwrap_or("")));
        Ok(answer)
    }

    fn print(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }
}
