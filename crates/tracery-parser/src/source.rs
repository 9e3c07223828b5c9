//! Splitting raw text into `@start...`/`@end...` blocks.
//!
//! Lines keep their 1-based number and byte span in the original text so
//! that every later stage can point diagnostics at the right place.

use std::fmt;

use log::debug;

use crate::{
    error::{Diagnostic, ErrorCode},
    span::Span,
};

/// The diagram language of a block, taken from `@start<kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Uml,
    Ebnf,
}

impl BlockKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "uml" => Some(Self::Uml),
            "ebnf" => Some(Self::Ebnf),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uml => f.write_str("uml"),
            Self::Ebnf => f.write_str("ebnf"),
        }
    }
}

/// One line of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    number: usize,
    span: Span,
    text: String,
}

impl SourceLine {
    pub fn new(number: usize, span: Span, text: impl Into<String>) -> Self {
        Self {
            number,
            span,
            text: text.into(),
        }
    }

    /// 1-based line number in the original text.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The same location with different text, used for preprocessed lines.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::new(self.number, self.span, text)
    }
}

/// A block of diagram source between `@start<kind>` and `@end<kind>`.
#[derive(Debug, Clone)]
pub struct SourceBlock {
    kind: BlockKind,
    name: Option<String>,
    index: usize,
    start: SourceLine,
    lines: Vec<SourceLine>,
    text: String,
}

impl SourceBlock {
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Name given with `@startuml name` or `@startuml(id=name)`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 0-based position of the block in its source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The `@start` line, or the first line for implicit blocks.
    pub fn start(&self) -> &SourceLine {
        &self.start
    }

    /// The lines between `@start` and `@end`.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    /// Block text from the `@start` line through the `@end` line.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Iterates the lines of `text` with their 1-based numbers and spans.
/// Line terminators (`\n` or `\r\n`) are not part of the line text.
pub fn numbered_lines(text: &str) -> impl Iterator<Item = SourceLine> + '_ {
    let mut offset = 0;
    text.split_inclusive('\n')
        .enumerate()
        .map(move |(index, raw)| {
            let start = offset;
            offset += raw.len();
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            let line = line.strip_suffix('\r').unwrap_or(line);
            SourceLine::new(index + 1, Span::new(start..start + line.len()), line)
        })
}

/// Parsed `@start<kind> [name]` header.
struct StartLine<'a> {
    kind: &'a str,
    name: Option<String>,
}

fn parse_start(line: &str) -> Option<StartLine<'_>> {
    let rest = line.trim().strip_prefix("@start")?;
    let kind_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if kind_len == 0 {
        return None;
    }
    let (kind, rest) = rest.split_at(kind_len);
    let rest = rest.trim();
    let name = if let Some(args) = rest.strip_prefix('(') {
        args.trim_end_matches(')')
            .split(',')
            .find_map(|arg| arg.trim().strip_prefix("id="))
            .map(|id| id.trim().to_string())
    } else if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    };
    Some(StartLine { kind, name })
}

fn end_kind(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("@end")?;
    let kind_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    Some(&rest[..kind_len])
}

/// Splits `text` into blocks.
///
/// Text outside blocks is ignored. A text without any `@start` line is one
/// implicit `uml` block. Problems are returned as diagnostics next to the
/// blocks that could be read.
pub fn split_blocks(text: &str) -> (Vec<SourceBlock>, Vec<Diagnostic>) {
    let lines: Vec<SourceLine> = numbered_lines(text).collect();
    let mut blocks = Vec::new();
    let mut diagnostics = Vec::new();

    if !lines.iter().any(|line| parse_start(line.text()).is_some()) {
        if let Some(first) = lines.first() {
            debug!("No @start line, reading the whole text as one block");
            blocks.push(SourceBlock {
                kind: BlockKind::Uml,
                name: None,
                index: 0,
                start: first.clone(),
                lines: lines.clone(),
                text: text.to_string(),
            });
        }
        return (blocks, diagnostics);
    }

    // Every closed block takes an index, whether or not it can be read.
    let mut ordinal = 0;
    let mut i = 0;
    while i < lines.len() {
        let Some(header) = parse_start(lines[i].text()) else {
            i += 1;
            continue;
        };
        let start = &lines[i];
        let Some(end) = lines[i + 1..]
            .iter()
            .position(|line| end_kind(line.text()).is_some())
            .map(|offset| i + 1 + offset)
        else {
            diagnostics.push(
                Diagnostic::error(format!("@start{} without matching @end", header.kind))
                    .with_code(ErrorCode::E001)
                    .with_label(start.span(), "block opened here")
                    .with_help(format!("close the block with `@end{}`", header.kind))
                    .with_line(start.number()),
            );
            break;
        };

        let end_line = &lines[end];
        let index = ordinal;
        ordinal += 1;
        if end_kind(end_line.text()).is_some_and(|kind| !kind.eq_ignore_ascii_case(header.kind)) {
            diagnostics.push(
                Diagnostic::error(format!("@start{} closed by {}", header.kind, end_line.text().trim()))
                    .with_code(ErrorCode::E003)
                    .with_label(end_line.span(), "mismatched end")
                    .with_secondary_label(start.span(), "block opened here")
                    .with_line(end_line.number()),
            );
        } else if let Some(kind) = BlockKind::from_name(header.kind) {
            debug!(kind:% = kind, index = index, first_line = start.number(); "Found block");
            blocks.push(SourceBlock {
                kind,
                name: header.name,
                index,
                start: start.clone(),
                lines: lines[i + 1..end].to_vec(),
                text: text[start.span().start()..end_line.span().end()].to_string(),
            });
        } else {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported diagram kind `{}`", header.kind))
                    .with_code(ErrorCode::E002)
                    .with_label(start.span(), "unknown kind")
                    .with_help("supported kinds: @startuml, @startebnf")
                    .with_line(start.number()),
            );
        }
        i = end + 1;
    }

    (blocks, diagnostics)
}

/// The part of a source that decides whether a diagram changed.
///
/// Keeps the first `@start` line through the first following `@end` line,
/// right-trims every line and normalises line endings. Anything after the
/// `@end` line, such as a version banner, is dropped. Without an `@start`
/// line the whole text is used, trimmed.
///
/// ```
/// # use tracery_parser::source::relevant_source;
/// let plain = "@startuml\nA -> B\n@enduml";
/// let banner = "@startuml  \r\nA -> B\r\n@enduml\n\ntracery 0.1.0\nLanguage: en";
/// assert_eq!(relevant_source(plain), relevant_source(banner));
/// ```
pub fn relevant_source(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let Some(start) = lines.iter().position(|line| parse_start(line).is_some()) else {
        return lines.join("\n").trim().to_string();
    };
    let end = lines[start + 1..]
        .iter()
        .position(|line| end_kind(line).is_some())
        .map_or(lines.len(), |offset| start + 1 + offset + 1);
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_lines_spans() {
        let text = "a\r\nbc\nd";
        let lines: Vec<SourceLine> = numbered_lines(text).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].number(), 2);
        assert_eq!(lines[1].text(), "bc");
        assert_eq!(&text[lines[1].span().start()..lines[1].span().end()], "bc");
        assert_eq!(lines[0].text(), "a");
    }

    #[test]
    fn test_split_two_blocks() {
        let text = "intro\n@startuml first\nA -> B\n@enduml\n@startebnf\na = b;\n@endebnf\n";
        let (blocks, diagnostics) = split_blocks(text);
        assert!(diagnostics.is_empty());
        assert_eq!(blocks.len(), 2);

        assert_eq!(blocks[0].kind(), BlockKind::Uml);
        assert_eq!(blocks[0].name(), Some("first"));
        assert_eq!(blocks[0].lines().len(), 1);
        assert_eq!(blocks[0].lines()[0].number(), 3);
        assert_eq!(blocks[0].text(), "@startuml first\nA -> B\n@enduml");

        assert_eq!(blocks[1].kind(), BlockKind::Ebnf);
        assert_eq!(blocks[1].index(), 1);
    }

    #[test]
    fn test_block_id_syntax() {
        let (blocks, _) = split_blocks("@startuml(id=login)\n@enduml");
        assert_eq!(blocks[0].name(), Some("login"));
    }

    #[test]
    fn test_implicit_block() {
        let (blocks, diagnostics) = split_blocks("A -> B\n");
        assert!(diagnostics.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind(), BlockKind::Uml);
        assert_eq!(blocks[0].lines().len(), 1);
    }

    #[test]
    fn test_missing_end() {
        let (blocks, diagnostics) = split_blocks("@startuml\nA -> B\n");
        assert!(blocks.is_empty());
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E001));
        assert_eq!(diagnostics[0].line(), Some(1));
    }

    #[test]
    fn test_unknown_kind() {
        let (blocks, diagnostics) = split_blocks("@startgantt\n@endgantt\n@startuml\n@enduml");
        assert_eq!(blocks.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E002));
        // The unreadable block still counts towards the indices.
        assert_eq!(blocks[0].index(), 1);
    }

    #[test]
    fn test_relevant_source_ignores_banner() {
        let diagram = "@startuml\n    interface List\n    class ArrayList\n\n    ArrayList --|> List\n@enduml";
        let banner_gb = format!("{diagram}\n\ntracery 0.1.0 (Thu Mar 09 17:30:18 GMT 2023)\nLanguage: en\nCountry: GB");
        let banner_hk = format!("{diagram}\n\ntracery 0.1.0 (Fri Mar 10 01:30:18 HKT 2023)\nLanguage: zh\nCountry: HK");

        assert_eq!(relevant_source(&banner_gb), relevant_source(&banner_hk));
        assert_eq!(relevant_source(&banner_gb), diagram);
    }

    #[test]
    fn test_relevant_source_without_start() {
        assert_eq!(relevant_source("\n  A -> B  \n\n"), "A -> B");
    }
}
