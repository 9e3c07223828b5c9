//! Diagram factories and selection of the factory for a block.
//!
//! A block does not say which kind of diagram it holds. Every factory of
//! the block's language is tried in turn and the first one whose commands
//! accept every line produces the diagram.

use indexmap::IndexMap;
use log::{debug, trace};

use tracery_core::model::{Diagram, DiagramKind, HasMeta, ModelError};

use crate::{
    command::Command,
    error::{Diagnostic, ErrorCode},
    source::{BlockKind, SourceLine},
};

/// Builds one kind of diagram from preprocessed lines.
pub trait DiagramFactory {
    type Diagram: HasMeta;

    fn kind(&self) -> DiagramKind;

    fn block_kind(&self) -> BlockKind;

    /// Commands in matching order.
    fn commands(&self) -> &[Box<dyn Command<Self::Diagram>>];

    fn create_empty(&self) -> Self::Diagram;

    /// Validates the finished aggregate and wraps it into a [`Diagram`].
    fn finish(&self, diagram: Self::Diagram) -> Result<Diagram, ModelError>;
}

/// Why a factory gave up on a block.
#[derive(Debug, Clone)]
pub struct FactoryFailure {
    /// Line number the failure points at; used to pick the most relevant
    /// failure among factories.
    pub line: usize,
    pub diagnostic: Diagnostic,
}

/// Object safe view of a [`DiagramFactory`].
pub trait AnyFactory {
    fn kind(&self) -> DiagramKind;

    fn block_kind(&self) -> BlockKind;

    fn build(
        &self,
        lines: &[SourceLine],
        pragmas: &IndexMap<String, String>,
    ) -> Result<Diagram, FactoryFailure>;
}

impl<F: DiagramFactory> AnyFactory for F {
    fn kind(&self) -> DiagramKind {
        DiagramFactory::kind(self)
    }

    fn block_kind(&self) -> BlockKind {
        DiagramFactory::block_kind(self)
    }

    fn build(
        &self,
        lines: &[SourceLine],
        pragmas: &IndexMap<String, String>,
    ) -> Result<Diagram, FactoryFailure> {
        let mut diagram = self.create_empty();
        diagram.meta_mut().pragmas = pragmas.clone();

        let mut index = 0;
        while index < lines.len() {
            let rest = &lines[index..];
            let line = &rest[0];
            let Some((command, consumed)) = self
                .commands()
                .iter()
                .find_map(|command| command.try_match(rest).map(|n| (command, n)))
            else {
                return Err(FactoryFailure {
                    line: line.number(),
                    diagnostic: Diagnostic::error(format!("Syntax error: `{}`", line.text().trim()))
                        .with_code(ErrorCode::E200)
                        .with_label(line.span(), "no command matches this line")
                        .with_line(line.number()),
                });
            };

            trace!(command = command.name(), line = line.number(), consumed = consumed; "Executing command");
            command
                .execute(&mut diagram, &rest[..consumed])
                .map_err(|err| FactoryFailure {
                    line: line.number(),
                    diagnostic: Diagnostic::error(err.message())
                        .with_code(ErrorCode::E201)
                        .with_label(line.span(), format!("in `{}`", command.name()))
                        .with_line(line.number()),
                })?;
            index += consumed;
        }

        let after_last = lines.last().map_or(0, |line| line.number() + 1);
        self.finish(diagram).map_err(|err| FactoryFailure {
            line: after_last,
            diagnostic: Diagnostic::error(err.to_string())
                .with_code(ErrorCode::E300)
                .with_line(after_last.saturating_sub(1).max(1)),
        })
    }
}

/// Tries `factories` of the block's language in order.
///
/// # Errors
///
/// When every factory fails, returns the failure that got furthest into the
/// block; on ties the earliest factory wins.
pub fn build_diagram(
    factories: &[Box<dyn AnyFactory>],
    block_kind: BlockKind,
    lines: &[SourceLine],
    pragmas: &IndexMap<String, String>,
) -> Result<Diagram, Diagnostic> {
    let mut best: Option<FactoryFailure> = None;

    for factory in factories.iter().filter(|f| f.block_kind() == block_kind) {
        match factory.build(lines, pragmas) {
            Ok(diagram) => {
                debug!(kind:? = factory.kind(); "Factory accepted block");
                return Ok(diagram);
            }
            Err(failure) => {
                debug!(
                    kind:? = factory.kind(),
                    line = failure.line;
                    "Factory rejected block"
                );
                if best.as_ref().is_none_or(|b| failure.line > b.line) {
                    best = Some(failure);
                }
            }
        }
    }

    Err(best.map_or_else(
        || Diagnostic::error(format!("No diagram type for @start{block_kind}")).with_code(ErrorCode::E002),
        |failure| failure.diagnostic,
    ))
}
