//! Sequence diagram grammar.

use log::debug;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{
        Diagram, DiagramKind, HasMeta, ModelError, SequenceDiagram,
        sequence::{
            ArrowBody, ArrowConfig, ArrowHead, Event, ExoMessage, ExoType, LifeEventKind, Message,
            Note, NotePosition, Participant, ParticipantKind,
        },
    },
};

use crate::{
    command::{
        Command, CommandError, CommandResult, LineLocation, MultiLineCommand, MultiLineMatch,
        RegexResult, SingleLineCommand, Trim, color_arg, common::common_commands, unquote,
    },
    factory::DiagramFactory,
    source::BlockKind,
};

/// A participant code, bare or quoted.
const CODE: &str = r#"(?:"[^"]+"|[\p{L}\p{N}_.@]+)"#;
const ARROW: &str = r"(?:<<|<|x)?-{1,2}(?:\[#\w+\]-?)?(?:>>|>|x)?";
const LIFE: &str = r"(?P<LIFE>\+\+|--|\*\*|!!)?";

/// An arrow as written between two participants.
#[derive(Debug, Clone, PartialEq)]
struct ParsedArrow {
    config: ArrowConfig,
    /// Points from the right participant to the left one.
    reversed: bool,
}

fn parse_arrow(text: &str) -> Result<ParsedArrow, CommandError> {
    let (left_head, rest) = if let Some(rest) = text.strip_prefix("<<") {
        (Some(ArrowHead::Async), rest)
    } else if let Some(rest) = text.strip_prefix('<') {
        (Some(ArrowHead::Normal), rest)
    } else if let Some(rest) = text.strip_prefix('x') {
        (Some(ArrowHead::Cross), rest)
    } else {
        (None, text)
    };

    let (right_head, body) = if let Some(body) = rest.strip_suffix(">>") {
        (Some(ArrowHead::Async), body)
    } else if let Some(body) = rest.strip_suffix('>') {
        (Some(ArrowHead::Normal), body)
    } else if let Some(body) = rest.strip_suffix('x') {
        (Some(ArrowHead::Cross), body)
    } else {
        (None, rest)
    };

    let color = match (body.find("[#"), body.find(']')) {
        (Some(open), Some(close)) if open < close => Some(&body[open + 1..close]),
        _ => None,
    };
    let dashes = body.chars().filter(|c| *c == '-').count();
    let arrow_body = if dashes >= 2 {
        ArrowBody::Dotted
    } else {
        ArrowBody::Normal
    };

    let (head, reversed, bidirectional) = match (left_head, right_head) {
        (Some(left), Some(_)) => (left, false, true),
        (Some(left), None) => (left, true, false),
        (None, Some(right)) => (right, false, false),
        (None, None) => return Err(CommandError::new(format!("Arrow `{text}` has no head"))),
    };

    let mut config = ArrowConfig::new(arrow_body, head).with_bidirectional(bidirectional);
    if let Some(color) = color {
        config = config.with_color(
            tracery_core::color::Color::from_sharp(color).map_err(CommandError::new)?,
        );
    }
    Ok(ParsedArrow { config, reversed })
}

fn code(text: &str) -> Id {
    Id::new(unquote(text))
}

fn apply_life(diagram: &mut SequenceDiagram, life: Option<&str>, from: Id, to: Id) -> CommandResult {
    match life {
        Some("++") => diagram.activate(to, LifeEventKind::Activate, None)?,
        Some("--") => diagram.activate(from, LifeEventKind::Deactivate, None)?,
        Some("**") => diagram.activate(to, LifeEventKind::Create, None)?,
        Some("!!") => diagram.activate(to, LifeEventKind::Destroy, None)?,
        _ => {}
    }
    Ok(())
}

fn participant(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let keyword = arg.get("KIND").unwrap_or_default();
    let kind = ParticipantKind::from_keyword(keyword)
        .ok_or_else(|| CommandError::new(format!("Unknown participant kind `{keyword}`")))?;
    let first = arg.get("FIRST").unwrap_or_default();

    let (code_text, display) = match arg.get("SECOND") {
        Some(second) if second.starts_with('"') => (first, Some(second)),
        Some(second) => (second, Some(first)),
        None => (first, None),
    };
    let display = display.map_or_else(Label::default, Label::with_newlines);
    let color = color_arg(arg, "COLOR")?;

    diagram.declare_participant(Participant::new(code(code_text), display, kind).with_color(color));
    Ok(())
}

fn message(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let arrow = parse_arrow(arg.get("ARROW").unwrap_or_default())?;
    let left = code(arg.get("FROM").unwrap_or_default());
    let right = code(arg.get("TO").unwrap_or_default());
    let (from, to) = if arrow.reversed { (right, left) } else { (left, right) };

    diagram.get_or_create_participant(left);
    diagram.get_or_create_participant(right);

    let label = arg.get("LABEL").map_or_else(Label::default, Label::with_newlines);
    let number = diagram.next_message_number();
    let mut message = Message::new(from, to, label, arrow.config, number);
    if arg.get("PARALLEL").is_some() {
        message.go_parallel();
    }
    diagram.add_message(Event::Message(message))?;
    apply_life(diagram, arg.get("LIFE"), from, to)
}

fn exo_message(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    // The arrow group is named after the side of the border it sits on.
    let arrow = arg
        .get("LEFT_ARROW")
        .or_else(|| arg.get("RIGHT_ARROW"))
        .unwrap_or_default();
    let arrow = parse_arrow(arrow)?;
    let (participant, exo_type) = match (arg.get("LEFT_CODE"), arg.get("RIGHT_CODE")) {
        (Some(code_text), _) if arrow.reversed => (code(code_text), ExoType::ToLeft),
        (Some(code_text), _) => (code(code_text), ExoType::FromLeft),
        (None, Some(code_text)) if arrow.reversed => (code(code_text), ExoType::FromRight),
        (None, Some(code_text)) => (code(code_text), ExoType::ToRight),
        (None, None) => return Err(CommandError::new("Exo message without participant")),
    };

    diagram.get_or_create_participant(participant);
    let label = arg.get("LABEL").map_or_else(Label::default, Label::with_newlines);
    let number = diagram.next_message_number();
    let mut exo = ExoMessage::new(participant, exo_type, label, arrow.config, number);
    if arg.get("PARALLEL").is_some() {
        exo.go_parallel();
    }
    diagram.add_message(Event::Exo(exo))?;

    match arg.get("LIFE") {
        Some("++") => diagram.activate(participant, LifeEventKind::Activate, None)?,
        Some("--") => diagram.activate(participant, LifeEventKind::Deactivate, None)?,
        _ => {}
    }
    Ok(())
}

fn life_event(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let participant = code(arg.get("CODE").unwrap_or_default());
    let kind = match arg.get("TYPE").map(str::to_ascii_lowercase).as_deref() {
        Some("activate") => LifeEventKind::Activate,
        Some("deactivate") => LifeEventKind::Deactivate,
        Some("destroy") => LifeEventKind::Destroy,
        _ => LifeEventKind::Create,
    };
    if kind == LifeEventKind::Create {
        diagram.get_or_create_participant(participant);
    }
    let color = color_arg(arg, "COLOR")?;
    diagram.activate(participant, kind, color)?;
    Ok(())
}

/// `[&] return [#color ] message`
///
/// Answers the message that opened the current activation and closes that
/// activation. Without an open activation the reply answers the last
/// message, and nothing is deactivated.
fn return_message(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let (original, deactivate) = match diagram.activating_message() {
        Some(event) => (event.clone(), true),
        None => match diagram.last_event_with_deactivate() {
            Some(event) if matches!(event, Event::Message(_)) => (event.clone(), false),
            _ => return Err(CommandError::new("Nowhere to return to.")),
        },
    };

    let label = Label::with_newlines(arg.get("MESSAGE").unwrap_or_default());
    let number = diagram.next_message_number();

    let (reply, target) = match &original {
        Event::Exo(exo) => {
            let mut arrow = exo.arrow().clone().with_body(ArrowBody::Dotted);
            if let Some(color) = color_arg(arg, "COLOR")? {
                arrow = arrow.with_color(color);
            }
            let reply = ExoMessage::new(
                exo.participant(),
                exo.exo_type().reverse(),
                label,
                arrow,
                number,
            );
            (Event::Exo(reply), exo.participant())
        }
        Event::Message(message) => {
            let mut arrow = message.arrow().clone().with_body(ArrowBody::Dotted);
            if let Some(color) = color_arg(arg, "COLOR")? {
                arrow = arrow.with_color(color);
            }
            let mut reply = Message::new(message.to(), message.from(), label, arrow, number);
            if arg.get("PARALLEL").is_some() {
                reply.go_parallel();
            }
            (Event::Message(reply), message.to())
        }
        _ => return Err(CommandError::new("Nowhere to return to.")),
    };

    diagram.add_message(reply)?;
    if deactivate {
        diagram.activate(target, LifeEventKind::Deactivate, None)?;
    }
    Ok(())
}

fn autonumber(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let start = arg.get("START").and_then(|s| s.parse().ok()).unwrap_or(1);
    let step = arg.get("STEP").and_then(|s| s.parse().ok()).unwrap_or(1);
    diagram.set_autonumber(start, step);
    Ok(())
}

fn note_codes(text: &str) -> Vec<Id> {
    text.split(',').map(code).collect()
}

fn add_note(
    diagram: &mut SequenceDiagram,
    position: &str,
    codes: &str,
    color: Option<tracery_core::color::Color>,
    text: Label,
) -> CommandResult {
    let position = NotePosition::from_keyword(position)
        .ok_or_else(|| CommandError::new(format!("Unknown note position `{position}`")))?;
    let participants = note_codes(codes);
    for participant in &participants {
        diagram.get_or_create_participant(*participant);
    }
    diagram.add_note(Note::new(participants, position, text, color));
    Ok(())
}

fn note(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let color = color_arg(arg, "COLOR")?;
    let text = Label::with_newlines(arg.get("NOTE").unwrap_or_default());
    match arg.get("OVER_CODES") {
        Some(codes) => add_note(diagram, "over", codes, color, text),
        None => add_note(
            diagram,
            arg.get("POSITION").unwrap_or_default(),
            arg.get("CODES").unwrap_or_default(),
            color,
            text,
        ),
    }
}

fn note_block(diagram: &mut SequenceDiagram, matched: &MultiLineMatch<'_>) -> CommandResult {
    let color = color_arg(&matched.start, "COLOR")?;
    let text = Label::from_lines(matched.body(false).iter().map(|line| line.to_string()));
    add_note(
        diagram,
        matched.start.get("POSITION").unwrap_or_default(),
        matched.start.get("CODES").unwrap_or_default(),
        color,
        text,
    )
}

fn divider(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    diagram.add_divider(Label::with_newlines(arg.get("TEXT").unwrap_or_default()));
    Ok(())
}

fn delay(diagram: &mut SequenceDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TEXT").map_or_else(Label::default, Label::with_newlines);
    diagram.add_delay(text);
    Ok(())
}

fn hide_footbox(diagram: &mut SequenceDiagram, _: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    diagram
        .meta_mut()
        .skin_params
        .insert("footbox".to_string(), "hide".to_string());
    Ok(())
}

pub struct SequenceFactory {
    commands: Vec<Box<dyn Command<SequenceDiagram>>>,
}

impl SequenceFactory {
    pub fn new() -> Self {
        let mut commands = common_commands::<SequenceDiagram>();
        commands.extend([
            SingleLineCommand::new(
                "participant",
                &format!(
                    r"^(?P<KIND>participant|actor|boundary|control|entity|database|collections|queue)\s+(?P<FIRST>{CODE})(?:\s+as\s+(?P<SECOND>{CODE}))?\s*(?P<COLOR>#\w+)?$"
                ),
                participant,
            )
            .boxed(),
            SingleLineCommand::new(
                "exo_message",
                &format!(
                    r"^(?P<PARALLEL>&\s*)?(?:[\[?]\s*(?P<LEFT_ARROW>{ARROW})\s*(?P<LEFT_CODE>{CODE})|(?P<RIGHT_CODE>{CODE})\s*(?P<RIGHT_ARROW>{ARROW})\s*[\]?])\s*{LIFE}\s*(?::\s*(?P<LABEL>.*))?$"
                ),
                exo_message,
            )
            .boxed(),
            SingleLineCommand::new(
                "message",
                &format!(
                    r"^(?P<PARALLEL>&\s*)?(?P<FROM>{CODE})\s*(?P<ARROW>{ARROW})\s*(?P<TO>{CODE})\s*{LIFE}\s*(?::\s*(?P<LABEL>.*))?$"
                ),
                message,
            )
            .boxed(),
            SingleLineCommand::new(
                "return",
                r"^(?P<PARALLEL>&\s*)?return\s*(?:(?P<COLOR>#\w+)\s+)?(?P<MESSAGE>.*)$",
                return_message,
            )
            .boxed(),
            SingleLineCommand::new(
                "life_event",
                &format!(r"^(?P<TYPE>activate|deactivate|destroy|create)\s+(?P<CODE>{CODE})\s*(?P<COLOR>#\w+)?$"),
                life_event,
            )
            .boxed(),
            SingleLineCommand::new(
                "autonumber",
                r"^autonumber(?:\s+(?P<START>\d+))?(?:\s+(?P<STEP>\d+))?$",
                autonumber,
            )
            .boxed(),
            SingleLineCommand::new(
                "note",
                &format!(
                    r"^note\s+(?:(?P<POSITION>left|right)(?:\s+of)?\s+(?P<CODES>{CODE})|over\s+(?P<OVER_CODES>{CODE}(?:\s*,\s*{CODE})?))\s*(?P<COLOR>#\w+)?\s*:\s*(?P<NOTE>.*)$"
                ),
                note,
            )
            .boxed(),
            MultiLineCommand::new(
                "note_block",
                &format!(
                    r"^note\s+(?P<POSITION>left|right|over)(?:\s+of)?\s+(?P<CODES>{CODE}(?:\s*,\s*{CODE})?)\s*(?P<COLOR>#\w+)?$"
                ),
                r"^end\s?note$",
                Trim::Both,
                note_block,
            )
            .boxed(),
            SingleLineCommand::new("divider", r"^==\s*(?P<TEXT>.*?)\s*==$", divider).boxed(),
            SingleLineCommand::new("delay", r"^\.{3}(?:\s*(?P<TEXT>.+?)\s*\.{3})?$", delay).boxed(),
            SingleLineCommand::new("hide_footbox", r"^hide\s+footbox$", hide_footbox).boxed(),
        ]);
        Self { commands }
    }
}

impl Default for SequenceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramFactory for SequenceFactory {
    type Diagram = SequenceDiagram;

    fn kind(&self) -> DiagramKind {
        DiagramKind::Sequence
    }

    fn block_kind(&self) -> BlockKind {
        BlockKind::Uml
    }

    fn commands(&self) -> &[Box<dyn Command<SequenceDiagram>>] {
        &self.commands
    }

    fn create_empty(&self) -> SequenceDiagram {
        SequenceDiagram::new()
    }

    fn finish(&self, diagram: SequenceDiagram) -> Result<Diagram, ModelError> {
        if diagram.participants().len() == 0 && diagram.events().is_empty() {
            return Err(ModelError::Empty);
        }
        debug!(
            participants = diagram.participants().len(),
            events = diagram.events().len();
            "Sequence diagram finished"
        );
        Ok(Diagram::Sequence(diagram))
    }
}
