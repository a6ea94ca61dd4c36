//! Operator input sources.

use crate::util::GraspResult;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Blocking line-oriented input with a prompt.
pub trait SelectionInput {
    /// Shows `message` and returns the next line without its line ending,
    /// or `None` at end of input.
    fn prompt(&mut self, message: &str) -> GraspResult<Option<String>>;
}

/// Reads answers from any `BufRead` and writes prompts to any `Write`.
///
/// `LineInput::new(stdin.lock(), stderr())` keeps stdout free for results.
pub struct LineInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> SelectionInput for LineInput<R, W> {
    fn prompt(&mut self, message: &str) -> GraspResult<Option<String>> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Pre-recorded answers, for tests and non-interactive runs.
///
/// Every prompt is recorded; once the answers run out the input reports end
/// of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, T>(answers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl SelectionInput for ScriptedInput {
    fn prompt(&mut self, message: &str) -> GraspResult<Option<String>> {
        self.prompts.push(message.to_string());
        Ok(self.answers.pop_front())
    }
}
