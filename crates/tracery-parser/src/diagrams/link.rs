//! Links between entities, shared by class and component diagrams.

use log::trace;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{DiagramKind, EntityDiagram, EntityKind, LineStyle, Link, LinkDecor},
};

use crate::command::{CommandError, CommandResult, RegexResult};

/// An entity reference as written at one end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Endpoint<'a> {
    pub code: &'a str,
    /// Kind implied by the syntax, e.g. `[x]` for a component.
    pub kind: Option<EntityKind>,
}

impl<'a> Endpoint<'a> {
    pub fn plain(code: &'a str) -> Self {
        Self { code, kind: None }
    }
}

/// Builds the link pattern for endpoints matching `endpoint`.
///
/// `o` only counts as a decoration when it stands apart from the entity
/// name, so `foo--bar` links `foo` and `bar`.
pub(super) fn link_pattern(endpoint: &str) -> String {
    format!(
        r"^(?P<ENT1>{endpoint})\s*(?P<LEFT><\||<|\*|\bo)?(?P<BODY>-+|\.+)(?P<RIGHT>\|>|>|\*|o\b)?\s*(?P<ENT2>{endpoint})\s*(?::\s*(?P<LABEL>.*))?$"
    )
}

fn decor(arg: &RegexResult<'_>, name: &str) -> Result<LinkDecor, CommandError> {
    let text = arg.get(name).unwrap_or_default();
    LinkDecor::parse(text).ok_or_else(|| CommandError::new(format!("Unknown decoration `{text}`")))
}

fn resolve(diagram: &mut EntityDiagram, endpoint: Endpoint<'_>) -> Id {
    let default_kind = match diagram.kind() {
        DiagramKind::Component => EntityKind::Component,
        _ => EntityKind::Class,
    };
    let code = Id::new(endpoint.code);
    diagram.get_or_create(code, endpoint.kind.unwrap_or(default_kind), false);
    code
}

/// Executes a matched link line, creating undeclared endpoints.
pub(super) fn add_link(
    diagram: &mut EntityDiagram,
    arg: &RegexResult<'_>,
    endpoint: fn(&str) -> Endpoint<'_>,
) -> CommandResult {
    let body = arg.get("BODY").unwrap_or_default();
    let from_decor = decor(arg, "LEFT")?;
    let to_decor = decor(arg, "RIGHT")?;

    let from = resolve(diagram, endpoint(arg.get("ENT1").unwrap_or_default()));
    let to = resolve(diagram, endpoint(arg.get("ENT2").unwrap_or_default()));

    trace!(from:% = from, to:% = to, body = body; "Adding link");
    diagram.add_link(Link {
        from,
        to,
        from_decor,
        to_decor,
        style: if body.starts_with('.') {
            LineStyle::Dotted
        } else {
            LineStyle::Solid
        },
        label: arg
            .get_non_empty("LABEL")
            .map_or_else(Label::default, Label::with_newlines),
        vertical: body.len() >= 2,
    });
    Ok(())
}
