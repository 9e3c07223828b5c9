//! Sequence diagram aggregate.
//!
//! A [`SequenceDiagram`] is an ordered list of participants and an ordered
//! list of [`Event`]s. Besides storing events it tracks the activation
//! state of lifelines, which the `return` command relies on to find the
//! message it answers.

use indexmap::IndexMap;
use log::trace;

use super::{DiagramMeta, ModelError};
use crate::{color::Color, identifier::Id, label::Label};

/// The visual flavour of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticipantKind {
    #[default]
    Participant,
    Actor,
    Boundary,
    Control,
    Entity,
    Database,
    Collections,
    Queue,
}

impl ParticipantKind {
    /// Parses the declaration keyword (`participant`, `actor`, ...).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_lowercase().as_str() {
            "participant" => Self::Participant,
            "actor" => Self::Actor,
            "boundary" => Self::Boundary,
            "control" => Self::Control,
            "entity" => Self::Entity,
            "database" => Self::Database,
            "collections" => Self::Collections,
            "queue" => Self::Queue,
            _ => return None,
        };
        Some(kind)
    }

    /// Upper-case name used in GraphML `entityType` data.
    pub fn graphml_name(self) -> &'static str {
        match self {
            Self::Participant => "PARTICIPANT",
            Self::Actor => "ACTOR",
            Self::Boundary => "BOUNDARY",
            Self::Control => "CONTROL",
            Self::Entity => "ENTITY",
            Self::Database => "DATABASE",
            Self::Collections => "COLLECTIONS",
            Self::Queue => "QUEUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    code: Id,
    display: Label,
    kind: ParticipantKind,
    color: Option<Color>,
    destroyed: bool,
}

impl Participant {
    pub fn new(code: Id, display: Label, kind: ParticipantKind) -> Self {
        Self {
            code,
            display,
            kind,
            color: None,
            destroyed: false,
        }
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub fn code(&self) -> Id {
        self.code
    }

    /// The label shown in the participant box; falls back to the code.
    pub fn display(&self) -> Label {
        if self.display.is_empty() {
            Label::plain(self.code.to_string())
        } else {
            self.display.clone()
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        self.kind
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrowBody {
    #[default]
    Normal,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrowHead {
    #[default]
    Normal,
    /// Open head, written `>>`.
    Async,
    /// Lost message, written `x`.
    Cross,
}

/// How a message arrow is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArrowConfig {
    body: ArrowBody,
    head: ArrowHead,
    bidirectional: bool,
    color: Option<Color>,
}

impl ArrowConfig {
    pub fn new(body: ArrowBody, head: ArrowHead) -> Self {
        Self {
            body,
            head,
            bidirectional: false,
            color: None,
        }
    }

    pub fn with_body(mut self, body: ArrowBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_head(mut self, head: ArrowHead) -> Self {
        self.head = head;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    pub fn body(&self) -> ArrowBody {
        self.body
    }

    pub fn head(&self) -> ArrowHead {
        self.head
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }
}

/// A message between two participants.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    from: Id,
    to: Id,
    label: Label,
    arrow: ArrowConfig,
    number: Option<u32>,
    parallel: bool,
}

impl Message {
    pub fn new(from: Id, to: Id, label: Label, arrow: ArrowConfig, number: Option<u32>) -> Self {
        Self {
            from,
            to,
            label,
            arrow,
            number,
            parallel: false,
        }
    }

    /// Marks the message as drawn on the same row as the previous one.
    pub fn go_parallel(&mut self) {
        self.parallel = true;
    }

    pub fn from(&self) -> Id {
        self.from
    }

    pub fn to(&self) -> Id {
        self.to
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn arrow(&self) -> &ArrowConfig {
        &self.arrow
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn is_self_message(&self) -> bool {
        self.from == self.to
    }
}

/// Direction of a message crossing the diagram border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExoType {
    /// `[-> A`
    FromLeft,
    /// `[<- A`
    ToLeft,
    /// `A <-]`
    FromRight,
    /// `A ->]`
    ToRight,
}

impl ExoType {
    /// The exo type of a reply travelling the opposite way.
    pub fn reverse(self) -> Self {
        match self {
            Self::FromLeft => Self::ToLeft,
            Self::ToLeft => Self::FromLeft,
            Self::FromRight => Self::ToRight,
            Self::ToRight => Self::FromRight,
        }
    }

    pub fn is_left(self) -> bool {
        matches!(self, Self::FromLeft | Self::ToLeft)
    }

    /// Whether the arrow points at the participant.
    pub fn is_incoming(self) -> bool {
        matches!(self, Self::FromLeft | Self::FromRight)
    }
}

/// A message between a participant and the diagram border.
#[derive(Debug, Clone, PartialEq)]
pub struct ExoMessage {
    participant: Id,
    exo_type: ExoType,
    label: Label,
    arrow: ArrowConfig,
    number: Option<u32>,
    parallel: bool,
}

impl ExoMessage {
    pub fn new(
        participant: Id,
        exo_type: ExoType,
        label: Label,
        arrow: ArrowConfig,
        number: Option<u32>,
    ) -> Self {
        Self {
            participant,
            exo_type,
            label,
            arrow,
            number,
            parallel: false,
        }
    }

    pub fn go_parallel(&mut self) {
        self.parallel = true;
    }

    pub fn participant(&self) -> Id {
        self.participant
    }

    pub fn exo_type(&self) -> ExoType {
        self.exo_type
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn arrow(&self) -> &ArrowConfig {
        &self.arrow
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifeEventKind {
    Activate,
    Deactivate,
    Destroy,
    Create,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifeEvent {
    participant: Id,
    kind: LifeEventKind,
    color: Option<Color>,
}

impl LifeEvent {
    pub fn participant(&self) -> Id {
        self.participant
    }

    pub fn kind(&self) -> LifeEventKind {
        self.kind
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotePosition {
    Left,
    Right,
    Over,
}

impl NotePosition {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "over" => Some(Self::Over),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    participants: Vec<Id>,
    position: NotePosition,
    text: Label,
    color: Option<Color>,
}

impl Note {
    pub fn new(
        participants: Vec<Id>,
        position: NotePosition,
        text: Label,
        color: Option<Color>,
    ) -> Self {
        Self {
            participants,
            position,
            text,
            color,
        }
    }

    pub fn participants(&self) -> &[Id] {
        &self.participants
    }

    pub fn position(&self) -> NotePosition {
        self.position
    }

    pub fn text(&self) -> &Label {
        &self.text
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }
}

/// Everything that occupies a row of a sequence diagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(Message),
    Exo(ExoMessage),
    Life(LifeEvent),
    Note(Note),
    Divider(Label),
    Delay(Label),
}

impl Event {
    /// The participant a message-like event points at.
    ///
    /// For exo messages this is the participant on the diagram side.
    pub fn target(&self) -> Option<Id> {
        match self {
            Self::Message(message) => Some(message.to()),
            Self::Exo(exo) => Some(exo.participant()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Autonumber {
    next: u32,
    step: u32,
}

/// The sequence diagram aggregate.
#[derive(Debug, Clone, Default)]
pub struct SequenceDiagram {
    pub(super) meta: DiagramMeta,
    participants: IndexMap<Id, Participant>,
    events: Vec<Event>,
    autonumber: Option<Autonumber>,
    /// Open activations, one entry per `activate`, in lifeline order.
    lifelines: Vec<Id>,
    /// Indices of the messages pushed by `activate`, innermost last.
    activation_stack: Vec<usize>,
    /// Index of the last message or exo message.
    last_event_with_deactivate: Option<usize>,
}

impl SequenceDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> impl ExactSizeIterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant(&self, code: Id) -> Option<&Participant> {
        self.participants.get(&code)
    }

    /// Index of a participant in declaration order.
    pub fn participant_index(&self, code: Id) -> Option<usize> {
        self.participants.get_index_of(&code)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Declares a participant, replacing the kind and label of an existing one.
    pub fn declare_participant(&mut self, participant: Participant) {
        trace!(code:% = participant.code(); "Declaring participant");
        match self.participants.get_mut(&participant.code()) {
            Some(existing) => {
                existing.display = participant.display;
                existing.kind = participant.kind;
                existing.color = participant.color;
            }
            None => {
                self.participants.insert(participant.code(), participant);
            }
        }
    }

    /// Returns the participant with the given code, creating a plain
    /// `participant` when it does not exist yet.
    pub fn get_or_create_participant(&mut self, code: Id) -> &Participant {
        self.participants
            .entry(code)
            .or_insert_with(|| Participant::new(code, Label::default(), ParticipantKind::default()))
    }

    /// Enables automatic message numbering.
    pub fn set_autonumber(&mut self, start: u32, step: u32) {
        self.autonumber = Some(Autonumber {
            next: start,
            step: step.max(1),
        });
    }

    /// Returns the number of the next message and advances the counter, or
    /// `None` when autonumbering is off.
    pub fn next_message_number(&mut self) -> Option<u32> {
        let autonumber = self.autonumber.as_mut()?;
        let number = autonumber.next;
        autonumber.next = autonumber.next.saturating_add(autonumber.step);
        Some(number)
    }

    /// The message whose activation is still open on top of the stack.
    pub fn activating_message(&self) -> Option<&Event> {
        self.activation_stack
            .last()
            .map(|&index| &self.events[index])
    }

    /// The most recent message or exo message.
    pub fn last_event_with_deactivate(&self) -> Option<&Event> {
        self.last_event_with_deactivate
            .map(|index| &self.events[index])
    }

    /// Number of open activations on a participant's lifeline.
    pub fn activation_depth(&self, code: Id) -> usize {
        self.lifelines
            .iter()
            .filter(|&&participant| participant == code)
            .count()
    }

    /// Appends a message event.
    ///
    /// # Errors
    ///
    /// Fails when a participant is unknown or already destroyed.
    pub fn add_message(&mut self, event: Event) -> Result<(), ModelError> {
        let involved: Vec<Id> = match &event {
            Event::Message(message) => vec![message.from(), message.to()],
            Event::Exo(exo) => vec![exo.participant()],
            _ => Vec::new(),
        };
        for code in involved {
            let participant = self
                .participants
                .get(&code)
                .ok_or_else(|| ModelError::UnknownParticipant(code.to_string()))?;
            if participant.is_destroyed() {
                return Err(ModelError::Destroyed(code.to_string()));
            }
        }

        self.events.push(event);
        self.last_event_with_deactivate = Some(self.events.len() - 1);
        Ok(())
    }

    /// Applies a life event to a participant's lifeline.
    ///
    /// `Activate` pushes the last message onto the activation stack, whatever
    /// its target, and `Deactivate` pops the top entry. A later `return`
    /// answers the message on top of the stack.
    ///
    /// # Errors
    ///
    /// Fails directly after a delay, for unknown participants, and when
    /// deactivating a lifeline without an open activation.
    pub fn activate(
        &mut self,
        code: Id,
        kind: LifeEventKind,
        color: Option<Color>,
    ) -> Result<(), ModelError> {
        if matches!(self.events.last(), Some(Event::Delay(_))) {
            return Err(ModelError::ActivationAfterDelay);
        }
        if !self.participants.contains_key(&code) {
            return Err(ModelError::UnknownParticipant(code.to_string()));
        }

        match kind {
            LifeEventKind::Activate => {
                if let Some(index) = self.last_event_with_deactivate {
                    self.activation_stack.push(index);
                }
                self.lifelines.push(code);
            }
            LifeEventKind::Deactivate => {
                let position = self
                    .lifelines
                    .iter()
                    .rposition(|&participant| participant == code)
                    .ok_or_else(|| ModelError::NotActive(code.to_string()))?;
                self.lifelines.remove(position);
                self.activation_stack.pop();
            }
            LifeEventKind::Destroy => {
                self.lifelines.retain(|&participant| participant != code);
                if let Some(participant) = self.participants.get_mut(&code) {
                    participant.destroyed = true;
                }
            }
            LifeEventKind::Create => {}
        }

        self.events.push(Event::Life(LifeEvent {
            participant: code,
            kind,
            color,
        }));
        Ok(())
    }

    pub fn add_note(&mut self, note: Note) {
        self.events.push(Event::Note(note));
    }

    pub fn add_divider(&mut self, text: Label) {
        self.events.push(Event::Divider(text));
    }

    pub fn add_delay(&mut self, text: Label) {
        self.events.push(Event::Delay(text));
    }
}
