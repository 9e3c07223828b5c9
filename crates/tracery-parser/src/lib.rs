//! # Tracery Parser
//!
//! Turns diagram source text into the in-memory model of
//! [`tracery_core::model`]. The pipeline for every source is:
//!
//! 1. **Split** - cut the text into `@start<kind>` / `@end<kind>` blocks
//! 2. **Preprocess** - expand variables, conditionals, loops and macros
//! 3. **Build** - feed the lines to the command grammar of each diagram
//!    family until one accepts the whole block
//!
//! ## Usage
//!
//! ```
//! # use tracery_parser::{parse, ParseError};
//! # use tracery_core::model::DiagramKind;
//! fn main() -> Result<(), ParseError> {
//!     let source = "@startuml\nAlice -> Bob : hello\n@enduml";
//!     let diagrams = parse(source)?;
//!     assert_eq!(diagrams[0].diagram().kind(), DiagramKind::Sequence);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod diagrams;
pub mod error;
pub mod factory;
pub mod preproc;
pub mod source;
mod span;

pub use error::ParseError;
pub use span::Span;

use log::{debug, info, warn};

use tracery_core::model::Diagram;

use crate::{
    error::DiagnosticCollector,
    factory::{AnyFactory, build_diagram},
    preproc::preprocess,
    source::{SourceBlock, split_blocks},
};

/// A diagram together with the block it was read from.
#[derive(Debug, Clone)]
pub struct ParsedDiagram {
    block: SourceBlock,
    diagram: Diagram,
}

impl ParsedDiagram {
    pub fn block(&self) -> &SourceBlock {
        &self.block
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn into_diagram(self) -> Diagram {
        self.diagram
    }
}

/// Reusable parser; compiles the command grammars once.
pub struct DiagramParser {
    factories: Vec<Box<dyn AnyFactory>>,
}

impl DiagramParser {
    pub fn new() -> Self {
        Self {
            factories: diagrams::factories(),
        }
    }

    /// Parses every block of `source`.
    ///
    /// All blocks are processed even when an earlier one fails, so the
    /// returned error lists every problem of the source.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] holding all error diagnostics when any
    /// block cannot be read.
    pub fn parse(&self, source: &str) -> Result<Vec<ParsedDiagram>, ParseError> {
        let (blocks, split_diagnostics) = split_blocks(source);
        let mut collector = DiagnosticCollector::new();
        for diagnostic in split_diagnostics {
            collector.emit(diagnostic);
        }

        let mut parsed = Vec::with_capacity(blocks.len());
        for block in blocks {
            let preprocessed = match preprocess(block.lines()) {
                Ok(preprocessed) => preprocessed,
                Err(diagnostic) => {
                    collector.emit(diagnostic);
                    continue;
                }
            };
            debug!(
                index = block.index(),
                lines = preprocessed.lines.len();
                "Block preprocessed"
            );

            match build_diagram(
                &self.factories,
                block.kind(),
                &preprocessed.lines,
                &preprocessed.pragmas,
            ) {
                Ok(diagram) => {
                    info!(index = block.index(), kind:? = diagram.kind(); "Diagram parsed");
                    parsed.push(ParsedDiagram { block, diagram });
                }
                Err(diagnostic) => collector.emit(diagnostic),
            }
        }

        for warning in collector.finish()? {
            warn!(line:? = warning.line(); "{}", warning.message());
        }
        Ok(parsed)
    }
}

impl Default for DiagramParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses every block of `source` with a fresh [`DiagramParser`].
///
/// # Errors
///
/// See [`DiagramParser::parse`].
pub fn parse(source: &str) -> Result<Vec<ParsedDiagram>, ParseError> {
    DiagramParser::new().parse(source)
}

#[cfg(test)]
mod tests {
    use tracery_core::model::{DiagramKind, HasMeta};

    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_each_block_picks_its_family() {
        let source = "@startuml\nrobust WB\n@0\nWB is Idle\n@enduml\n\n@startuml\n[comp1]\n() \"intf1\"\n@enduml\n\n@startebnf\na = \"x\" ;\n@endebnf\n\n@startuml\ninterface List\nclass ArrayList\nArrayList --|> List\n@enduml";
        let kinds: Vec<_> = parse(source)
            .unwrap()
            .iter()
            .map(|parsed| parsed.diagram().kind())
            .collect();
        assert_eq!(
            kinds,
            [
                DiagramKind::Timing,
                DiagramKind::Component,
                DiagramKind::Ebnf,
                DiagramKind::Class
            ]
        );
    }

    #[test]
    fn test_preprocessed_lines_reach_the_grammar() {
        let source = "@startuml\n!$target = \"Bob\"\n!pragma teoz true\nAlice -> $target : hi\n@enduml";
        let parsed = parse(source).unwrap();
        let Diagram::Sequence(diagram) = parsed[0].diagram() else {
            panic!("expected a sequence diagram");
        };
        let codes: Vec<String> = diagram.participants().map(|p| p.code().to_string()).collect();
        assert_eq!(codes, ["Alice", "Bob"]);
        assert_eq!(diagram.meta().pragmas.get("teoz").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_errors_from_every_block_are_collected() {
        let source = "@startuml\nA -> B\nthis is nonsense\n@enduml\n@startuml\n!assert 1 == 2 : broken\n@enduml";
        let err = parse(source).unwrap_err();
        let codes: Vec<_> = err.diagnostics().iter().map(|d| d.code()).collect();
        assert_eq!(codes, [Some(ErrorCode::E200), Some(ErrorCode::E105)]);
        assert_eq!(err.diagnostics()[0].line(), Some(3));
    }

    #[test]
    fn test_block_text_is_kept() {
        let parsed = parse("@startuml\nA -> B\n@enduml").unwrap();
        assert_eq!(parsed[0].block().text(), "@startuml\nA -> B\n@enduml");
    }
}
