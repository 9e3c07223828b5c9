//! Line matching commands.
//!
//! A diagram grammar is a list of [`Command`]s. Each command recognises one
//! or more lines with a regular expression and mutates the diagram under
//! construction. The first command that matches the current line wins.

pub mod common;

use std::fmt;

use regex::{Captures, Regex};
use thiserror::Error;

use tracery_core::model::ModelError;

use crate::{source::SourceLine, span::Span};

/// Message of a failed command execution, shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ModelError> for CommandError {
    fn from(err: ModelError) -> Self {
        Self::new(err.to_string())
    }
}

pub type CommandResult = Result<(), CommandError>;

/// Where the first line of a command sits in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLocation {
    line: usize,
    span: Span,
}

impl LineLocation {
    pub fn of(line: &SourceLine) -> Self {
        Self {
            line: line.number(),
            span: line.span(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}

/// Named captures of a matched command line.
#[derive(Debug)]
pub struct RegexResult<'t> {
    captures: Captures<'t>,
}

impl<'t> RegexResult<'t> {
    /// The text of a named group, `None` when the group did not take part
    /// in the match.
    pub fn get(&self, name: &str) -> Option<&'t str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Like [`get`](Self::get), with empty matches treated as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&'t str> {
        self.get(name).filter(|value| !value.is_empty())
    }
}

/// A grammar rule of diagram type `D`.
pub trait Command<D> {
    fn name(&self) -> &'static str;

    /// Number of lines consumed when the command accepts the beginning of
    /// `lines`.
    fn try_match(&self, lines: &[SourceLine]) -> Option<usize>;

    /// Applies the command to the lines returned by a successful match.
    fn execute(&self, diagram: &mut D, lines: &[SourceLine]) -> CommandResult;
}

fn compile(name: &str, pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid pattern for command {name}: {err}"))
}

pub type SingleLineExecutor<D> = fn(&mut D, &RegexResult<'_>, LineLocation) -> CommandResult;

/// A command matching exactly one (trimmed) line.
pub struct SingleLineCommand<D> {
    name: &'static str,
    regex: Regex,
    executor: SingleLineExecutor<D>,
}

impl<D> SingleLineCommand<D> {
    /// # Panics
    ///
    /// Panics when `pattern` is not a valid regular expression.
    pub fn new(name: &'static str, pattern: &str, executor: SingleLineExecutor<D>) -> Self {
        Self {
            name,
            regex: compile(name, pattern),
            executor,
        }
    }

    pub fn boxed(self) -> Box<dyn Command<D>>
    where
        D: 'static,
    {
        Box::new(self)
    }
}

impl<D> Command<D> for SingleLineCommand<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_match(&self, lines: &[SourceLine]) -> Option<usize> {
        let line = lines.first()?;
        self.regex.is_match(line.text().trim()).then_some(1)
    }

    fn execute(&self, diagram: &mut D, lines: &[SourceLine]) -> CommandResult {
        let line = lines
            .first()
            .ok_or_else(|| CommandError::new(format!("{} needs a line", self.name)))?;
        let captures = self
            .regex
            .captures(line.text().trim())
            .ok_or_else(|| CommandError::new(format!("{} does not match", self.name)))?;
        (self.executor)(diagram, &RegexResult { captures }, LineLocation::of(line))
    }
}

/// How body lines of a multi-line command are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Both,
    None,
}

impl Trim {
    fn apply(self, text: &str) -> &str {
        match self {
            Self::Both => text.trim(),
            Self::None => text,
        }
    }
}

/// What a multi-line executor receives.
#[derive(Debug)]
pub struct MultiLineMatch<'t> {
    /// Captures of the starting line.
    pub start: RegexResult<'t>,
    /// Lines after the start (or including it, when kept) through the end
    /// line, cleaned up by the command's [`Trim`].
    pub lines: Vec<&'t str>,
    pub location: LineLocation,
}

impl MultiLineMatch<'_> {
    /// The lines between the start and the end line.
    pub fn body(&self, keep_start: bool) -> &[&str] {
        let from = usize::from(keep_start && !self.lines.is_empty()).min(self.lines.len());
        let to = self.lines.len().saturating_sub(1).max(from);
        &self.lines[from..to]
    }
}

pub type MultiLineExecutor<D> = fn(&mut D, &MultiLineMatch<'_>) -> CommandResult;

/// A command spanning a start line through the first line matching `end`.
pub struct MultiLineCommand<D> {
    name: &'static str,
    start: Regex,
    end: Regex,
    trim: Trim,
    keep_start: bool,
    executor: MultiLineExecutor<D>,
}

impl<D> MultiLineCommand<D> {
    /// # Panics
    ///
    /// Panics when a pattern is not a valid regular expression.
    pub fn new(
        name: &'static str,
        start: &str,
        end: &str,
        trim: Trim,
        executor: MultiLineExecutor<D>,
    ) -> Self {
        Self {
            name,
            start: compile(name, start),
            end: compile(name, end),
            trim,
            keep_start: false,
            executor,
        }
    }

    /// Passes the starting line to the executor as the first line.
    pub fn keeping_start(mut self) -> Self {
        self.keep_start = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Command<D>>
    where
        D: 'static,
    {
        Box::new(self)
    }

    fn end_index(&self, lines: &[SourceLine]) -> Option<usize> {
        lines
            .iter()
            .skip(1)
            .position(|line| self.end.is_match(line.text().trim()))
            .map(|offset| offset + 1)
    }
}

impl<D> Command<D> for MultiLineCommand<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_match(&self, lines: &[SourceLine]) -> Option<usize> {
        let first = lines.first()?;
        if !self.start.is_match(first.text().trim()) {
            return None;
        }
        self.end_index(lines).map(|end| end + 1)
    }

    fn execute(&self, diagram: &mut D, lines: &[SourceLine]) -> CommandResult {
        let first = lines
            .first()
            .ok_or_else(|| CommandError::new(format!("{} needs a line", self.name)))?;
        let captures = self
            .start
            .captures(first.text().trim())
            .ok_or_else(|| CommandError::new(format!("{} does not match", self.name)))?;
        let end = self
            .end_index(lines)
            .ok_or_else(|| CommandError::new(format!("{} is not terminated", self.name)))?;

        let from = if self.keep_start { 0 } else { 1 };
        let body = lines[from..=end]
            .iter()
            .map(|line| self.trim.apply(line.text()))
            .collect();

        (self.executor)(
            diagram,
            &MultiLineMatch {
                start: RegexResult { captures },
                lines: body,
                location: LineLocation::of(first),
            },
        )
    }
}

/// Code of an element as written in the source: quotes are removed.
pub(crate) fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

/// Reads an optional `#color` capture.
pub(crate) fn color_arg(
    arg: &RegexResult<'_>,
    name: &str,
) -> Result<Option<tracery_core::color::Color>, CommandError> {
    arg.get_non_empty(name)
        .map(tracery_core::color::Color::from_sharp)
        .transpose()
        .map_err(CommandError::new)
}
