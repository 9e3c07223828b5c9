//! Renders [`TraceryError`]s as miette reports.
//!
//! A parse error becomes one [`Report`] per diagnostic, shown against the
//! source file it was read from. A diagnostic that only knows its line is
//! labeled on that line. When the file holds several diagram blocks, the
//! `@start` line of the block the problem sits in is labeled too.

use std::{fmt, path::Path};

use miette::{
    Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, Severity as MietteSeverity,
    SourceSpan,
};

use tracery::TraceryError;
use tracery_parser::{
    Span,
    error::{Diagnostic, Severity},
    source::{SourceBlock, numbered_lines, split_blocks},
};

/// Name shown for sources that did not come from a file.
const ANONYMOUS_SOURCE: &str = "<source>";

/// One error report, ready for a miette handler.
#[derive(Debug)]
pub struct Report {
    message: String,
    code: Option<String>,
    severity: MietteSeverity,
    help: Option<String>,
    source: Option<NamedSource<String>>,
    labels: Vec<LabeledSpan>,
}

impl Report {
    fn from_diagnostic(diag: &Diagnostic, src: &str, origin: &str, blocks: &[SourceBlock]) -> Self {
        let mut labels: Vec<LabeledSpan> = diag
            .labels()
            .iter()
            .map(|label| {
                let message = Some(label.message().to_string());
                let span = to_source_span(label.span());
                if label.is_primary() {
                    LabeledSpan::new_primary_with_span(message, span)
                } else {
                    LabeledSpan::new_with_span(message, span)
                }
            })
            .collect();

        let line_label = diag
            .line()
            .filter(|_| labels.is_empty())
            .and_then(|line| line_span(src, line).map(|span| (line, span)));
        if let Some((line, span)) = line_label {
            labels.push(LabeledSpan::new_primary_with_span(
                Some(format!("line {line}")),
                to_source_span(span),
            ));
        }

        if blocks.len() > 1 {
            let block = diag.line().and_then(|line| {
                blocks
                    .iter()
                    .rev()
                    .find(|block| block.start().number() <= line)
            });
            if let Some(block) = block {
                let start = to_source_span(block.start().span());
                if !labels.iter().any(|label| label.inner() == &start) {
                    labels.push(LabeledSpan::new_with_span(
                        Some(block_caption(block)),
                        start,
                    ));
                }
            }
        }

        Self {
            message: diag.message().to_string(),
            code: diag.code().map(|code| code.to_string()),
            severity: match diag.severity() {
                Severity::Error => MietteSeverity::Error,
                Severity::Warning => MietteSeverity::Warning,
            },
            help: diag.help().map(str::to_string),
            source: Some(NamedSource::new(origin, src.to_string())),
            labels,
        }
    }

    fn from_error(err: &TraceryError, input: Option<&Path>) -> Self {
        let message = match input {
            Some(path) => format!("{}: {err}", path.display()),
            None => err.to_string(),
        };
        let (code, help) = match err {
            TraceryError::Io(_) => (
                "tracery::io",
                Some("check that the input exists and the output directory is writable"),
            ),
            TraceryError::Parse { .. } => ("tracery::parse", None),
            TraceryError::Layout(_) => ("tracery::layout", None),
            TraceryError::Export(_) => ("tracery::export", None),
        };
        Self {
            message,
            code: Some(code.to_string()),
            severity: MietteSeverity::Error,
            help: help.map(str::to_string),
            source: None,
            labels: Vec::new(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Report {}

impl MietteDiagnostic for Report {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.code
            .as_ref()
            .map(|code| Box::new(code) as Box<dyn fmt::Display + 'a>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_ref()
            .map(|source| source as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            return None;
        }
        Some(Box::new(self.labels.iter().cloned()))
    }
}

fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Span of the 1-based `line` of `src`.
fn line_span(src: &str, line: usize) -> Option<Span> {
    numbered_lines(src)
        .nth(line.checked_sub(1)?)
        .map(|source_line| source_line.span())
}

fn block_caption(block: &SourceBlock) -> String {
    match block.name() {
        Some(name) => format!("in block `{name}`"),
        None => format!("in block {}", block.index()),
    }
}

/// Converts an error into reports, one per parse diagnostic.
///
/// `input` names the file being processed. It titles the source snippet
/// of parse diagnostics and prefixes the message of every other error.
pub fn to_reports(err: &TraceryError, input: Option<&Path>) -> Vec<Report> {
    match err {
        TraceryError::Parse { err: parse_err, src } => {
            let origin = input.map_or_else(
                || ANONYMOUS_SOURCE.to_string(),
                |path| path.display().to_string(),
            );
            let (blocks, _) = split_blocks(src);
            parse_err
                .diagnostics()
                .iter()
                .map(|diag| Report::from_diagnostic(diag, src, &origin, &blocks))
                .collect()
        }
        _ => vec![Report::from_error(err, input)],
    }
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use tracery_parser::error::{ErrorCode, ParseError};

    use super::*;

    const TWO_BLOCKS: &str = "@startuml first\nA -> B\n@enduml\n@startuml second\nbad\n@enduml";

    fn parse_error(diags: Vec<Diagnostic>, src: &str) -> TraceryError {
        TraceryError::new_parse_error(ParseError::new(diags), src)
    }

    fn spans(report: &Report) -> Vec<(usize, usize, bool)> {
        report
            .labels()
            .map(|labels| {
                labels
                    .map(|label| (label.offset(), label.len(), label.primary()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_one_report_per_diagnostic() {
        let err = parse_error(
            vec![
                Diagnostic::error("first error")
                    .with_code(ErrorCode::E200)
                    .with_label(Span::new(0..5), "first"),
                Diagnostic::error("second error")
                    .with_code(ErrorCode::E103)
                    .with_help("help for second"),
            ],
            "hello world",
        );

        let reports = to_reports(&err, Some(Path::new("flow.puml")));
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].to_string(), "first error");
        assert_eq!(reports[0].code().unwrap().to_string(), "E200");
        assert_eq!(reports[1].help().unwrap().to_string(), "help for second");
        assert!(reports[0].source_code().is_some());
    }

    #[test]
    fn test_labels_keep_primary_flag() {
        let err = parse_error(
            vec![
                Diagnostic::error("mismatched end")
                    .with_label(Span::new(7..14), "here")
                    .with_secondary_label(Span::new(0..6), "opened here"),
            ],
            "@start\n@endfoo",
        );
        let reports = to_reports(&err, None);
        assert_eq!(spans(&reports[0]), [(7, 7, true), (0, 6, false)]);
    }

    #[test]
    fn test_line_only_diagnostic_is_labeled_on_its_line() {
        let err = parse_error(
            vec![Diagnostic::error("Nowhere to return to.").with_line(3)],
            "@startuml\nA -> B\nbad\n@enduml",
        );
        let reports = to_reports(&err, None);
        let labels: Vec<_> = reports[0].labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!((labels[0].offset(), labels[0].len()), (17, 3));
        assert_eq!(labels[0].label(), Some("line 3"));
    }

    #[test]
    fn test_enclosing_block_is_labeled() {
        let err = parse_error(
            vec![
                Diagnostic::error("no command matches")
                    .with_label(Span::new(48..51), "here")
                    .with_line(5),
            ],
            TWO_BLOCKS,
        );
        let reports = to_reports(&err, None);
        let labels: Vec<_> = reports[0].labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert_eq!((labels[1].offset(), labels[1].len()), (31, 16));
        assert_eq!(labels[1].label(), Some("in block `second`"));
        assert!(!labels[1].primary());
    }

    #[test]
    fn test_single_block_gets_no_block_label() {
        let err = parse_error(
            vec![Diagnostic::error("bad").with_label(Span::new(10..16), "here").with_line(2)],
            "@startuml\nA -> B\n@enduml",
        );
        assert_eq!(spans(&to_reports(&err, None)[0]), [(10, 6, true)]);
    }

    #[test]
    fn test_warning_severity() {
        let err = parse_error(vec![Diagnostic::warning("unused")], "A -> B");
        let reports = to_reports(&err, None);
        assert_eq!(reports[0].severity(), Some(MietteSeverity::Warning));
        assert!(reports[0].labels().is_none());
    }

    #[test]
    fn test_io_error_names_the_input() {
        let err = TraceryError::Io(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let input = PathBuf::from("demos/absent.puml");
        let reports = to_reports(&err, Some(&input));

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].to_string(), "demos/absent.puml: I/O error: missing");
        assert_eq!(reports[0].code().unwrap().to_string(), "tracery::io");
        assert!(reports[0].help().is_some());
        assert!(reports[0].source_code().is_none());
    }

    #[test]
    fn test_layout_error_without_input() {
        let err = TraceryError::Layout("Unknown entity `x`".to_string());
        let reports = to_reports(&err, None);
        assert_eq!(reports[0].to_string(), "Layout error: Unknown entity `x`");
        assert_eq!(reports[0].code().unwrap().to_string(), "tracery::layout");
    }
}
