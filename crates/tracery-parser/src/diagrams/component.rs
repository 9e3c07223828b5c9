//! Component diagram grammar.

use log::debug;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{Diagram, DiagramKind, EntityDiagram, EntityKind, ModelError, Stereotype},
};

use super::{
    class::code_and_display,
    link::{self, Endpoint},
};
use crate::{
    command::{
        Command, CommandResult, LineLocation, RegexResult, SingleLineCommand, color_arg,
        common::common_commands, unquote,
    },
    factory::DiagramFactory,
    source::BlockKind,
};

const CODE: &str = r#"(?:"[^"]+"|[\p{L}\p{N}_.]+)"#;

/// Link ends: `[name]`, `() name` or a bare code.
const ENDPOINT: &str = r#"(?:\[[^\]]+\]|\(\)\s*(?:"[^"]+"|[\p{L}\p{N}_.]+)|"[^"]+"|[\p{L}\p{N}_.]+)"#;

/// Trailing `as alias`, stereotype and color of a declaration.
const DECORATIONS: &str =
    r"(?:\s+as\s+(?P<ALIAS>(?:\x22[^\x22]+\x22|[\p{L}\p{N}_.]+)))?\s*(?P<STEREO><<.+?>>)?\s*(?P<COLOR>#\w+)?";

fn entity_kind(keyword: &str) -> EntityKind {
    match keyword.to_ascii_lowercase().as_str() {
        "interface" => EntityKind::Circle,
        "actor" => EntityKind::Actor,
        "node" => EntityKind::Node,
        "database" => EntityKind::Database,
        "rectangle" => EntityKind::Rectangle,
        _ => EntityKind::Component,
    }
}

fn declare(
    diagram: &mut EntityDiagram,
    arg: &RegexResult<'_>,
    kind: EntityKind,
    name: &str,
) -> CommandResult {
    let (code, display) = match arg.get("ALIAS") {
        // `[Long name] as alias`: the bracketed text is the display.
        Some(alias) if !name.starts_with('"') && !alias.starts_with('"') => {
            (unquote(alias), Label::with_newlines(name))
        }
        alias => code_and_display(name, alias),
    };
    let color = color_arg(arg, "COLOR")?;
    let stereotype = arg.get("STEREO").and_then(Stereotype::parse);

    let code = Id::new(code);
    debug!(code:% = code, kind:? = kind; "Declaring component");
    let entity = diagram.get_or_create(code, kind, true);
    entity.set_display(display);
    entity.set_color(color);
    entity.set_stereotype(stereotype);
    Ok(())
}

fn bracketed(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let name = arg.get("NAME").unwrap_or_default();
    declare(diagram, arg, EntityKind::Component, name)
}

fn circle(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let name = arg.get("NAME").unwrap_or_default();
    declare(diagram, arg, EntityKind::Circle, name)
}

fn keyword(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let kind = entity_kind(arg.get("TYPE").unwrap_or_default());
    let name = arg.get("NAME").unwrap_or_default();
    let name = name
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(name);
    declare(diagram, arg, kind, name)
}

fn endpoint(text: &str) -> Endpoint<'_> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return Endpoint {
            code: inner.trim(),
            kind: Some(EntityKind::Component),
        };
    }
    if let Some(rest) = text.strip_prefix("()") {
        return Endpoint {
            code: unquote(rest),
            kind: Some(EntityKind::Circle),
        };
    }
    Endpoint::plain(unquote(text))
}

fn link(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    link::add_link(diagram, arg, endpoint)
}

pub struct ComponentFactory {
    commands: Vec<Box<dyn Command<EntityDiagram>>>,
}

impl ComponentFactory {
    pub fn new() -> Self {
        let mut commands = common_commands::<EntityDiagram>();
        commands.extend([
            SingleLineCommand::new(
                "bracketed_component",
                &format!(r"^\[(?P<NAME>[^\]]+)\]{DECORATIONS}$"),
                bracketed,
            )
            .boxed(),
            SingleLineCommand::new(
                "circle_interface",
                &format!(r"^\(\)\s*(?P<NAME>{CODE}){DECORATIONS}$"),
                circle,
            )
            .boxed(),
            SingleLineCommand::new(
                "component",
                &format!(
                    r"^(?P<TYPE>component|interface|actor|node|database|rectangle)\s+(?P<NAME>\[[^\]]+\]|{CODE}){DECORATIONS}$"
                ),
                keyword,
            )
            .boxed(),
            SingleLineCommand::new("link", &link::link_pattern(ENDPOINT), link).boxed(),
        ]);
        Self { commands }
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramFactory for ComponentFactory {
    type Diagram = EntityDiagram;

    fn kind(&self) -> DiagramKind {
        DiagramKind::Component
    }

    fn block_kind(&self) -> BlockKind {
        BlockKind::Uml
    }

    fn commands(&self) -> &[Box<dyn Command<EntityDiagram>>] {
        &self.commands
    }

    fn create_empty(&self) -> EntityDiagram {
        EntityDiagram::new(DiagramKind::Component)
    }

    fn finish(&self, diagram: EntityDiagram) -> Result<Diagram, ModelError> {
        if diagram.entities().len() == 0 {
            return Err(ModelError::Empty);
        }
        Ok(Diagram::Entity(diagram))
    }
}
