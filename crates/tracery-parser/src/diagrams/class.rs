//! Class diagram grammar.

use log::debug;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{Diagram, DiagramKind, EntityDiagram, EntityKind, ModelError, Stereotype},
};

use super::link::{self, Endpoint};
use crate::{
    command::{
        Command, CommandError, CommandResult, LineLocation, MultiLineCommand, MultiLineMatch,
        RegexResult, SingleLineCommand, Trim, color_arg, common::common_commands, unquote,
    },
    factory::DiagramFactory,
    source::BlockKind,
};

const CODE: &str = r#"(?:"[^"]+"|[\p{L}\p{N}_.]+)"#;

fn declaration_prefix() -> String {
    format!(
        r"^(?P<TYPE>class|abstract\s+class|abstract|interface|enum|annotation)\s+(?P<NAME>{CODE})(?:\s+as\s+(?P<ALIAS>{CODE}))?\s*(?P<STEREO><<.+?>>)?\s*(?P<COLOR>#\w+)?"
    )
}

fn entity_kind(keyword: &str) -> EntityKind {
    match keyword.split_whitespace().next().unwrap_or_default() {
        "abstract" => EntityKind::AbstractClass,
        "interface" => EntityKind::Interface,
        "enum" => EntityKind::Enum,
        "annotation" => EntityKind::Annotation,
        _ => EntityKind::Class,
    }
}

/// Code and display of `NAME [as ALIAS]`: a quoted side is the display.
pub(super) fn code_and_display<'a>(name: &'a str, alias: Option<&'a str>) -> (&'a str, Label) {
    match alias {
        None => (unquote(name), Label::default()),
        Some(alias) if alias.starts_with('"') => (unquote(name), Label::with_newlines(alias)),
        Some(alias) => (alias, Label::with_newlines(name)),
    }
}

/// Declares the entity and returns its code.
fn declare(diagram: &mut EntityDiagram, arg: &RegexResult<'_>) -> Result<Id, CommandError> {
    let kind = entity_kind(arg.get("TYPE").unwrap_or_default());
    let (code, display) = code_and_display(arg.get("NAME").unwrap_or_default(), arg.get("ALIAS"));
    let color = color_arg(arg, "COLOR")?;
    let stereotype = arg.get("STEREO").and_then(Stereotype::parse);

    let code = Id::new(code);
    debug!(code:% = code, kind:? = kind; "Declaring class");
    let entity = diagram.get_or_create(code, kind, true);
    entity.set_display(display);
    entity.set_color(color);
    entity.set_stereotype(stereotype);
    Ok(code)
}

fn add_members<'a>(diagram: &mut EntityDiagram, code: Id, members: impl IntoIterator<Item = &'a str>) {
    if let Some(entity) = diagram.entity_mut(code) {
        for member in members.into_iter().map(str::trim).filter(|m| !m.is_empty()) {
            entity.add_member(member);
        }
    }
}

fn class(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let code = declare(diagram, arg)?;
    if let Some(body) = arg.get("BODY") {
        let inner = body.trim_start_matches('{').trim_end_matches('}');
        add_members(diagram, code, inner.split(';'));
    }
    Ok(())
}

fn class_block(diagram: &mut EntityDiagram, matched: &MultiLineMatch<'_>) -> CommandResult {
    let code = declare(diagram, &matched.start)?;
    add_members(diagram, code, matched.body(false).iter().copied());
    Ok(())
}

fn endpoint(text: &str) -> Endpoint<'_> {
    Endpoint::plain(unquote(text))
}

fn link(diagram: &mut EntityDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    link::add_link(diagram, arg, endpoint)
}

pub struct ClassFactory {
    commands: Vec<Box<dyn Command<EntityDiagram>>>,
}

impl ClassFactory {
    pub fn new() -> Self {
        let prefix = declaration_prefix();
        let mut commands = common_commands::<EntityDiagram>();
        commands.extend([
            SingleLineCommand::new(
                "class",
                &format!(r"{prefix}\s*(?P<BODY>\{{.*\}})?$"),
                class,
            )
            .boxed(),
            MultiLineCommand::new(
                "class_block",
                &format!(r"{prefix}\s*\{{$"),
                r"^\}$",
                Trim::Both,
                class_block,
            )
            .boxed(),
            SingleLineCommand::new("link", &link::link_pattern(CODE), link).boxed(),
        ]);
        Self { commands }
    }
}

impl Default for ClassFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramFactory for ClassFactory {
    type Diagram = EntityDiagram;

    fn kind(&self) -> DiagramKind {
        DiagramKind::Class
    }

    fn block_kind(&self) -> BlockKind {
        BlockKind::Uml
    }

    fn commands(&self) -> &[Box<dyn Command<EntityDiagram>>] {
        &self.commands
    }

    fn create_empty(&self) -> EntityDiagram {
        EntityDiagram::new(DiagramKind::Class)
    }

    fn finish(&self, diagram: EntityDiagram) -> Result<Diagram, ModelError> {
        if diagram.entities().len() == 0 {
            return Err(ModelError::Empty);
        }
        Ok(Diagram::Entity(diagram))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use tracery_core::model::{Entity, LineStyle, LinkDecor};

    use super::*;
    use crate::{factory::AnyFactory, source::numbered_lines};

    fn build(text: &str) -> Result<EntityDiagram, crate::error::Diagnostic> {
        let lines: Vec<_> = numbered_lines(text).collect();
        match ClassFactory::new().build(&lines, &IndexMap::new()) {
            Ok(Diagram::Entity(diagram)) => Ok(diagram),
            Ok(other) => panic!("unexpected diagram {:?}", other.kind()),
            Err(failure) => Err(failure.diagnostic),
        }
    }

    #[test]
    fn test_declarations() {
        let diagram = build(
            "interface List\nabstract class \"Abstract List\" as AL <<base>> #LightBlue\nenum Color {RED; GREEN}\nannotation Deprecated",
        )
        .unwrap();
        let kinds: Vec<_> = diagram.entities().map(Entity::kind).collect();
        assert_eq!(
            kinds,
            [
                EntityKind::Interface,
                EntityKind::AbstractClass,
                EntityKind::Enum,
                EntityKind::Annotation
            ]
        );
        let al = diagram.entity(Id::new("AL")).unwrap();
        assert_eq!(al.display().to_string(), "Abstract List");
        assert!(al.stereotype().is_some());
        assert!(al.color().is_some());
        assert_eq!(diagram.entity(Id::new("Color")).unwrap().members(), ["RED", "GREEN"]);
    }

    #[test]
    fn test_class_body_block() {
        let diagram = build("class Car {\n  +wheels : int\n\n  +drive()\n}").unwrap();
        assert_eq!(
            diagram.entity(Id::new("Car")).unwrap().members(),
            ["+wheels : int", "+drive()"]
        );
    }

    #[test]
    fn test_links_create_classes() {
        let diagram = build("interface List\nclass ArrayList\n\nArrayList --|> List\nA o.. B : has\nfoo-bar").unwrap();
        let links = diagram.links();
        assert_eq!(links.len(), 3);

        assert_eq!(links[0].from, Id::new("ArrayList"));
        assert_eq!(links[0].to_decor, LinkDecor::Extends);
        assert!(links[0].vertical);

        assert_eq!(links[1].from_decor, LinkDecor::Aggregation);
        assert_eq!(links[1].style, LineStyle::Dotted);
        assert_eq!(links[1].label.to_string(), "has");

        assert_eq!(links[2].from, Id::new("foo"));
        assert!(!links[2].vertical);
        assert_eq!(
            diagram.entity(Id::new("B")).map(Entity::kind),
            Some(EntityKind::Class)
        );
        assert_eq!(diagram.entity(Id::new("B")).map(Entity::uid), Some("cl0005"));
    }

    #[test]
    fn test_sequence_syntax_is_rejected() {
        let err = build("class A\nparticipant B").unwrap_err();
        assert_eq!(err.line(), Some(2));
    }
}
