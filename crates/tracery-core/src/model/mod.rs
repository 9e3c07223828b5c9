//! In-memory diagram model.
//!
//! Each diagram family owns an aggregate ([`SequenceDiagram`],
//! [`TimingDiagram`], [`EbnfDiagram`], [`EntityDiagram`]) that the command
//! grammars mutate line by line. The aggregates enforce their own
//! invariants and report violations as [`ModelError`].

pub mod ebnf;
pub mod entity;
pub mod sequence;
pub mod timing;

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::label::Label;

pub use ebnf::{EbnfDiagram, EbnfExpr, EbnfRule};
pub use entity::{Entity, EntityDiagram, EntityKind, LineStyle, Link, LinkDecor};
pub use sequence::SequenceDiagram;
pub use timing::TimingDiagram;

/// Errors raised by the diagram aggregates.
///
/// The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown participant \"{0}\"")]
    UnknownParticipant(String),

    #[error("Participant \"{0}\" is not active")]
    NotActive(String),

    #[error("Participant \"{0}\" has been destroyed")]
    Destroyed(String),

    #[error("You cannot activate or deactivate just after a delay")]
    ActivationAfterDelay,

    #[error("Rule \"{0}\" is defined multiple times")]
    DuplicateRule(String),

    #[error("Player \"{0}\" is already defined")]
    DuplicatePlayer(String),

    #[error("Empty diagram")]
    Empty,
}

/// The diagram family of a parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Sequence,
    Timing,
    Ebnf,
    Class,
    Component,
}

impl DiagramKind {
    /// Upper-case name used in GraphML `diagramType` data.
    pub fn graphml_name(self) -> &'static str {
        match self {
            Self::Sequence => "SEQUENCE",
            Self::Timing => "TIMING",
            Self::Ebnf => "EBNF",
            Self::Class => "CLASS",
            Self::Component => "COMPONENT",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequence => "sequence",
            Self::Timing => "timing",
            Self::Ebnf => "ebnf",
            Self::Class => "class",
            Self::Component => "component",
        };
        f.write_str(name)
    }
}

/// Decorations and settings shared by every diagram family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramMeta {
    pub title: Option<Label>,
    pub header: Option<Label>,
    pub footer: Option<Label>,
    pub caption: Option<Label>,
    /// `skinparam` values, keys lower-cased.
    pub skin_params: IndexMap<String, String>,
    /// `!pragma` values forwarded by the preprocessor.
    pub pragmas: IndexMap<String, String>,
}

impl DiagramMeta {
    pub fn skin_param(&self, key: &str) -> Option<&str> {
        self.skin_params
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A `<<stereotype>>` attached to an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stereotype {
    labels: Vec<String>,
}

impl Stereotype {
    /// Builds a stereotype from source text such as `<<entity>>` or
    /// `<<a>> <<b>>`. Returns `None` when no label is found.
    ///
    /// ```
    /// use tracery_core::model::Stereotype;
    ///
    /// let stereo = Stereotype::parse("<<service>> <<remote>>").unwrap();
    /// assert_eq!(stereo.labels(), ["service", "remote"]);
    /// assert!(Stereotype::parse("plain").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let mut labels = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find("<<") {
            let after = &rest[start + 2..];
            let Some(end) = after.find(">>") else {
                break;
            };
            let label = after[..end].trim();
            if !label.is_empty() {
                labels.push(label.to_string());
            }
            rest = &after[end + 2..];
        }
        (!labels.is_empty()).then_some(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl fmt::Display for Stereotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for label in &self.labels {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "\u{ab}{label}\u{bb}")?;
            first = false;
        }
        Ok(())
    }
}

/// A fully parsed diagram of any family.
#[derive(Debug, Clone)]
pub enum Diagram {
    Sequence(SequenceDiagram),
    Timing(TimingDiagram),
    Ebnf(EbnfDiagram),
    Entity(EntityDiagram),
}

impl Diagram {
    pub fn kind(&self) -> DiagramKind {
        match self {
            Self::Sequence(_) => DiagramKind::Sequence,
            Self::Timing(_) => DiagramKind::Timing,
            Self::Ebnf(_) => DiagramKind::Ebnf,
            Self::Entity(diagram) => diagram.kind(),
        }
    }

    pub fn meta(&self) -> &DiagramMeta {
        match self {
            Self::Sequence(diagram) => diagram.meta(),
            Self::Timing(diagram) => diagram.meta(),
            Self::Ebnf(diagram) => diagram.meta(),
            Self::Entity(diagram) => diagram.meta(),
        }
    }

    /// Short human description, e.g. `(2 entities)`.
    pub fn description(&self) -> String {
        fn plural(count: usize, word: &str) -> String {
            if count == 1 {
                format!("({count} {word})")
            } else {
                format!("({count} {word}s)")
            }
        }

        match self {
            Self::Sequence(diagram) => plural(diagram.participants().len(), "participant"),
            Self::Timing(diagram) => plural(diagram.players().len(), "player"),
            Self::Ebnf(diagram) => plural(diagram.rules().len(), "rule"),
            Self::Entity(diagram) => {
                let count = diagram.entities().len();
                if count == 1 {
                    "(1 entity)".to_string()
                } else {
                    format!("({count} entities)")
                }
            }
        }
    }
}

/// Implemented by aggregates so the shared commands (`title`, `skinparam`
/// and friends) can reach their [`DiagramMeta`].
pub trait HasMeta {
    fn meta(&self) -> &DiagramMeta;
    fn meta_mut(&mut self) -> &mut DiagramMeta;
}

macro_rules! impl_has_meta {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasMeta for $ty {
                fn meta(&self) -> &DiagramMeta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut DiagramMeta {
                    &mut self.meta
                }
            }
        )*
    };
}

impl_has_meta!(SequenceDiagram, TimingDiagram, EbnfDiagram, EntityDiagram);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereotype_single() {
        let stereo = Stereotype::parse("<< entity >>").unwrap();
        assert_eq!(stereo.labels(), ["entity"]);
        assert_eq!(stereo.to_string(), "\u{ab}entity\u{bb}");
    }

    #[test]
    fn test_stereotype_unterminated() {
        assert!(Stereotype::parse("<<open").is_none());
    }

    #[test]
    fn test_skin_param_lookup_is_case_insensitive() {
        let mut meta = DiagramMeta::default();
        meta.skin_params
            .insert("backgroundcolor".to_string(), "#eee".to_string());
        assert_eq!(meta.skin_param("BackgroundColor"), Some("#eee"));
    }

    #[test]
    fn test_graphml_names() {
        assert_eq!(DiagramKind::Component.graphml_name(), "COMPONENT");
        assert_eq!(DiagramKind::Class.graphml_name(), "CLASS");
    }
}
