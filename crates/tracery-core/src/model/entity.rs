//! Entity diagrams: class and component diagrams share one aggregate.
//!
//! Entities receive a uid of the form `clNNNN` in creation order. The
//! numbering starts at `cl0002`, uid 1 being reserved for the diagram
//! itself in exported graphs.

use indexmap::IndexMap;
use log::trace;

use super::{DiagramKind, DiagramMeta, Stereotype};
use crate::{color::Color, identifier::Id, label::Label};

const FIRST_UID: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Class,
    AbstractClass,
    Interface,
    Enum,
    Annotation,
    Component,
    /// Lollipop interface, `() name`.
    Circle,
    Actor,
    Node,
    Database,
    Rectangle,
}

impl EntityKind {
    pub fn graphml_name(self) -> &'static str {
        match self {
            Self::Class => "CLASS",
            Self::AbstractClass => "ABSTRACT_CLASS",
            Self::Interface => "INTERFACE",
            Self::Enum => "ENUM",
            Self::Annotation => "ANNOTATION",
            Self::Component => "COMPONENT",
            Self::Circle => "CIRCLE",
            Self::Actor => "ACTOR",
            Self::Node => "NODE",
            Self::Database => "DATABASE",
            Self::Rectangle => "RECTANGLE",
        }
    }

    /// The single letter drawn in a class header circle.
    pub fn class_marker(self) -> Option<char> {
        match self {
            Self::Class => Some('C'),
            Self::AbstractClass => Some('A'),
            Self::Interface => Some('I'),
            Self::Enum => Some('E'),
            Self::Annotation => Some('@'),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    code: Id,
    uid: String,
    kind: EntityKind,
    display: Label,
    stereotype: Option<Stereotype>,
    color: Option<Color>,
    members: Vec<String>,
}

impl Entity {
    pub fn code(&self) -> Id {
        self.code
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn display(&self) -> Label {
        if self.display.is_empty() {
            Label::plain(self.code.to_string())
        } else {
            self.display.clone()
        }
    }

    pub fn stereotype(&self) -> Option<&Stereotype> {
        self.stereotype.as_ref()
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn set_stereotype(&mut self, stereotype: Option<Stereotype>) {
        if stereotype.is_some() {
            self.stereotype = stereotype;
        }
    }

    pub fn set_color(&mut self, color: Option<Color>) {
        if color.is_some() {
            self.color = color;
        }
    }

    pub fn set_display(&mut self, display: Label) {
        if !display.is_empty() {
            self.display = display;
        }
    }

    pub fn add_member(&mut self, member: impl Into<String>) {
        self.members.push(member.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkDecor {
    #[default]
    None,
    Arrow,
    Extends,
    Composition,
    Aggregation,
}

impl LinkDecor {
    /// Parses the decoration drawn at either end of a link.
    pub fn parse(text: &str) -> Option<Self> {
        let decor = match text {
            "" => Self::None,
            ">" | "<" => Self::Arrow,
            "|>" | "<|" => Self::Extends,
            "*" => Self::Composition,
            "o" => Self::Aggregation,
            _ => return None,
        };
        Some(decor)
    }

    pub fn graphml_name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Arrow => "ARROW",
            Self::Extends => "EXTENDS",
            Self::Composition => "COMPOSITION",
            Self::Aggregation => "AGREGATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub from: Id,
    pub to: Id,
    pub from_decor: LinkDecor,
    pub to_decor: LinkDecor,
    pub style: LineStyle,
    pub label: Label,
    /// `--` style links are laid out vertically, `-` horizontally.
    pub vertical: bool,
}

/// The entity diagram aggregate.
#[derive(Debug, Clone)]
pub struct EntityDiagram {
    pub(super) meta: DiagramMeta,
    kind: DiagramKind,
    entities: IndexMap<Id, Entity>,
    links: Vec<Link>,
}

impl EntityDiagram {
    /// `kind` is either [`DiagramKind::Class`] or [`DiagramKind::Component`].
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            meta: DiagramMeta::default(),
            kind,
            entities: IndexMap::new(),
            links: Vec::new(),
        }
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn entities(&self) -> impl ExactSizeIterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, code: Id) -> Option<&Entity> {
        self.entities.get(&code)
    }

    pub fn entity_mut(&mut self, code: Id) -> Option<&mut Entity> {
        self.entities.get_mut(&code)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the entity for `code`, creating it with `kind` if needed.
    ///
    /// An existing entity keeps its uid. Its kind is replaced only when
    /// `kind` is given explicitly by a declaration.
    pub fn get_or_create(&mut self, code: Id, kind: EntityKind, declared: bool) -> &mut Entity {
        let next_uid = self.entities.len() + FIRST_UID;
        let entity = self.entities.entry(code).or_insert_with(|| {
            trace!(code:% = code, uid = next_uid; "Creating entity");
            Entity {
                code,
                uid: format!("cl{next_uid:04}"),
                kind,
                display: Label::default(),
                stereotype: None,
                color: None,
                members: Vec::new(),
            }
        });
        if declared {
            entity.kind = kind;
        }
        entity
    }

    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_start_at_two() {
        let mut diagram = EntityDiagram::new(DiagramKind::Component);
        diagram.get_or_create(Id::new("comp1"), EntityKind::Component, true);
        diagram.get_or_create(Id::new("intf1"), EntityKind::Circle, true);

        let uids: Vec<&str> = diagram.entities().map(Entity::uid).collect();
        assert_eq!(uids, ["cl0002", "cl0003"]);
    }

    #[test]
    fn test_redeclaration_keeps_uid_and_updates_kind() {
        let mut diagram = EntityDiagram::new(DiagramKind::Class);
        diagram.get_or_create(Id::new("A"), EntityKind::Class, false);
        let entity = diagram.get_or_create(Id::new("A"), EntityKind::Interface, true);
        assert_eq!(entity.uid(), "cl0002");
        assert_eq!(entity.kind(), EntityKind::Interface);

        let entity = diagram.get_or_create(Id::new("A"), EntityKind::Class, false);
        assert_eq!(entity.kind(), EntityKind::Interface);
    }

    #[test]
    fn test_link_decor_parse() {
        assert_eq!(LinkDecor::parse("<|"), Some(LinkDecor::Extends));
        assert_eq!(LinkDecor::parse("o"), Some(LinkDecor::Aggregation));
        assert_eq!(LinkDecor::parse("#"), None);
    }
}
