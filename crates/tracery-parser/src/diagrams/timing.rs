//! Timing diagram grammar.

use log::debug;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{
        Diagram, DiagramKind, ModelError, Stereotype, TimingDiagram,
        timing::{NotePosition, Player, PlayerKind, TimeMessage},
    },
};

use crate::{
    command::{
        Command, CommandError, CommandResult, LineLocation, RegexResult, SingleLineCommand,
        common::common_commands, unquote,
    },
    factory::DiagramFactory,
    source::BlockKind,
};

/// Player codes.
const PLAYER_CODE: &str = r"[\p{L}\p{N}_.@]+";

/// Player codes inside messages, where `@` introduces a tick.
const MESSAGE_CODE: &str = r"[\p{L}\p{N}_.]+";

fn parse_tick(text: &str) -> Result<i64, CommandError> {
    text.trim_start_matches('+')
        .parse()
        .map_err(|_| CommandError::new(format!("Invalid time `{text}`")))
}

/// `ticks` after the current tick.
fn after_now(diagram: &TimingDiagram, ticks: i64) -> Result<i64, CommandError> {
    diagram
        .now()
        .checked_add(ticks)
        .ok_or_else(|| CommandError::new(format!("Time overflow: @{} + {ticks}", diagram.now())))
}

/// A tick written after `@`: relative to now when it starts with `+`.
fn resolve_tick(diagram: &TimingDiagram, text: Option<&str>) -> Result<i64, CommandError> {
    match text {
        None => Ok(diagram.now()),
        Some(text) if text.starts_with('+') => after_now(diagram, parse_tick(text)?),
        Some(text) => parse_tick(text),
    }
}

fn declared_player(arg: &RegexResult<'_>) -> (Id, Label) {
    match (arg.get("DISPLAY"), arg.get("CODE")) {
        (Some(display), Some(code)) => (Id::new(code), Label::with_newlines(display)),
        (_, Some(code)) => (Id::new(code), Label::default()),
        (_, None) => {
            let code = arg.get("BARE").unwrap_or_default();
            (Id::new(unquote(code)), Label::default())
        }
    }
}

fn player(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let kind = match arg.get("TYPE").map(str::to_ascii_lowercase).as_deref() {
        Some("robust") => PlayerKind::Robust,
        Some("concise") => PlayerKind::Concise,
        _ => PlayerKind::Binary,
    };
    let (code, display) = declared_player(arg);
    diagram.add_player(Player::new(code, display, kind))?;
    Ok(())
}

fn clock(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let number = |name: &str| -> Result<Option<i64>, CommandError> {
        arg.get(name).map(parse_tick).transpose()
    };
    let period = number("PERIOD")?.unwrap_or(1).max(1);
    let pulse = number("PULSE")?.unwrap_or(period / 2).clamp(0, period);
    let offset = number("OFFSET")?.unwrap_or(0);

    let (code, display) = declared_player(arg);
    diagram.add_player(Player::new(
        code,
        display,
        PlayerKind::Clock {
            period,
            pulse,
            offset,
        },
    ))?;
    Ok(())
}

fn time(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TIME").unwrap_or_default();
    if text.starts_with('+') {
        let tick = after_now(diagram, parse_tick(text)?)?;
        diagram.set_now(tick);
    } else {
        diagram.set_now(parse_tick(text)?);
    }
    Ok(())
}

fn state(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let code = arg.get("CODE").unwrap_or_default();
    let player = Id::new(code);
    if diagram.player(player).is_none() {
        return Err(CommandError::new(format!("Unkown \"{code}\"")));
    }
    let state = match arg.get("STATE").unwrap_or_default().trim() {
        "{hidden}" | "{-}" => None,
        text => Some(unquote(text).to_string()),
    };
    diagram.set_state(player, state)?;
    Ok(())
}

fn message(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let from = Id::new(arg.get("FROM").unwrap_or_default());
    let to = Id::new(arg.get("TO").unwrap_or_default());
    let from_tick = resolve_tick(diagram, arg.get("FROM_TICK"))?;
    let to_tick = resolve_tick(diagram, arg.get("TO_TICK"))?;
    let label = arg.get("LABEL").map_or_else(Label::default, Label::with_newlines);
    diagram.add_message(TimeMessage {
        from,
        from_tick,
        to,
        to_tick,
        label,
    })?;
    Ok(())
}

/// `note top|bottom of CODE [$tags] [<<stereotype>>] : text`
fn note(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let code = arg.get("CODE").unwrap_or_default();
    let player = Id::new(code);
    if diagram.player(player).is_none() {
        return Err(CommandError::new(format!("Unkown \"{code}\"")));
    }

    let text = Label::with_newlines(arg.get("NOTE").unwrap_or_default());
    let position = arg
        .get("POSITION")
        .and_then(NotePosition::from_keyword)
        .unwrap_or(NotePosition::Top);
    let stereotype = arg.get("STEREO").and_then(Stereotype::parse);
    let tags = arg
        .get("TAGS")
        .map(|tags| {
            tags.split_whitespace()
                .filter_map(|tag| tag.strip_prefix('$'))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    diagram.add_note(player, position, text, stereotype, tags)?;
    Ok(())
}

fn scale(diagram: &mut TimingDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let ticks = parse_tick(arg.get("TICKS").unwrap_or_default())?;
    let pixels = parse_tick(arg.get("PIXELS").unwrap_or_default())?;
    diagram.set_scale(ticks, pixels);
    Ok(())
}

pub struct TimingFactory {
    commands: Vec<Box<dyn Command<TimingDiagram>>>,
}

impl TimingFactory {
    pub fn new() -> Self {
        let declaration = format!(r#"(?:(?P<DISPLAY>"[^"]+")\s+as\s+(?P<CODE>{PLAYER_CODE})|(?P<BARE>{PLAYER_CODE}|"[^"]+"))"#);
        let mut commands = common_commands::<TimingDiagram>();
        commands.extend([
            SingleLineCommand::new(
                "player",
                &format!(r"^(?P<TYPE>robust|concise|binary)\s+{declaration}$"),
                player,
            )
            .boxed(),
            SingleLineCommand::new(
                "clock",
                &format!(
                    r"^clock\s+{declaration}\s+with\s+period\s+(?P<PERIOD>\d+)(?:\s+pulse\s+(?P<PULSE>\d+))?(?:\s+offset\s+(?P<OFFSET>\d+))?$"
                ),
                clock,
            )
            .boxed(),
            SingleLineCommand::new("time", r"^@(?P<TIME>[+-]?\d+)$", time).boxed(),
            SingleLineCommand::new(
                "note",
                &format!(
                    r"^note\s+(?P<POSITION>top|bottom)\s+of\s+(?P<CODE>{PLAYER_CODE})\s*(?P<TAGS>(?:\$\w+\s*)+)?(?P<STEREO><<.+>>)?\s*:\s*(?P<NOTE>.+?)$"
                ),
                note,
            )
            .boxed(),
            SingleLineCommand::new(
                "message",
                &format!(
                    r"^(?P<FROM>{MESSAGE_CODE})(?:@(?P<FROM_TICK>[+-]?\d+))?\s*->\s*(?P<TO>{MESSAGE_CODE})(?:@(?P<TO_TICK>[+-]?\d+))?\s*(?::\s*(?P<LABEL>.*))?$"
                ),
                message,
            )
            .boxed(),
            SingleLineCommand::new(
                "state",
                &format!(r#"^(?P<CODE>{PLAYER_CODE})\s+is\s+(?P<STATE>"[^"]*"|\S.*)$"#),
                state,
            )
            .boxed(),
            SingleLineCommand::new(
                "scale",
                r"^scale\s+(?P<TICKS>\d+)\s+as\s+(?P<PIXELS>\d+)\s+pixels?$",
                scale,
            )
            .boxed(),
        ]);
        Self { commands }
    }
}

impl Default for TimingFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramFactory for TimingFactory {
    type Diagram = TimingDiagram;

    fn kind(&self) -> DiagramKind {
        DiagramKind::Timing
    }

    fn block_kind(&self) -> BlockKind {
        BlockKind::Uml
    }

    fn commands(&self) -> &[Box<dyn Command<TimingDiagram>>] {
        &self.commands
    }

    fn create_empty(&self) -> TimingDiagram {
        TimingDiagram::new()
    }

    fn finish(&self, diagram: TimingDiagram) -> Result<Diagram, ModelError> {
        if diagram.players().len() == 0 {
            return Err(ModelError::Empty);
        }
        debug!(players = diagram.players().len(); "Timing diagram finished");
        Ok(Diagram::Timing(diagram))
    }
}
