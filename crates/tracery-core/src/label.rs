//! Multi-line display text.
//!
//! Diagram sources write line breaks inside labels with the two character
//! escape `\n`. A [`Label`] holds the already split lines.

use std::fmt;

/// Display text made of one or more lines.
///
/// # Examples
///
/// ```
/// use tracery_core::label::Label;
///
/// let label = Label::with_newlines(r"first\nsecond");
/// assert_eq!(label.lines(), ["first", "second"]);
/// assert_eq!(label.to_string(), "first\nsecond");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Label {
    lines: Vec<String>,
}

impl Label {
    /// Creates a label from raw source text, expanding `\n`, `\t` and `\\`.
    ///
    /// Surrounding double quotes are removed when the whole text is quoted.
    pub fn with_newlines(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(raw);

        let mut lines = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\\' {
                current.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('n') => {
                    chars.next();
                    lines.push(std::mem::take(&mut current));
                }
                Some('t') => {
                    chars.next();
                    current.push('\t');
                }
                Some('\\') => {
                    chars.next();
                    current.push('\\');
                }
                _ => current.push('\\'),
            }
        }
        lines.push(current);

        if lines.len() == 1 && lines[0].is_empty() {
            lines.clear();
        }
        Self { lines }
    }

    /// Creates a single line label without escape processing.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self { lines: vec![text] }
    }

    /// Creates a label from already split lines.
    pub fn from_lines(lines: impl IntoIterator<Item = String>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}
