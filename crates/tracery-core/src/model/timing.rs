//! Timing diagram aggregate.

use indexmap::IndexMap;
use log::trace;

use super::{DiagramMeta, ModelError, Stereotype};
use crate::{identifier::Id, label::Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerKind {
    Robust,
    Concise,
    Binary,
    Clock { period: i64, pulse: i64, offset: i64 },
}

impl PlayerKind {
    pub fn graphml_name(self) -> &'static str {
        match self {
            Self::Robust => "ROBUST",
            Self::Concise => "CONCISE",
            Self::Binary => "BINARY",
            Self::Clock { .. } => "CLOCK",
        }
    }
}

/// A state change at a tick. `None` marks the hidden state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub tick: i64,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotePosition {
    Top,
    Bottom,
}

impl NotePosition {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingNote {
    tick: i64,
    position: NotePosition,
    text: Label,
    stereotype: Option<Stereotype>,
    tags: Vec<String>,
}

impl TimingNote {
    pub fn new(
        tick: i64,
        position: NotePosition,
        text: Label,
        stereotype: Option<Stereotype>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            tick,
            position,
            text,
            stereotype,
            tags,
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn position(&self) -> NotePosition {
        self.position
    }

    pub fn text(&self) -> &Label {
        &self.text
    }

    pub fn stereotype(&self) -> Option<&Stereotype> {
        self.stereotype.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    code: Id,
    display: Label,
    kind: PlayerKind,
    changes: Vec<StateChange>,
    notes: Vec<TimingNote>,
}

impl Player {
    pub fn new(code: Id, display: Label, kind: PlayerKind) -> Self {
        Self {
            code,
            display,
            kind,
            changes: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn code(&self) -> Id {
        self.code
    }

    pub fn display(&self) -> Label {
        if self.display.is_empty() {
            Label::plain(self.code.to_string())
        } else {
            self.display.clone()
        }
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    /// State changes sorted by tick; later changes on the same tick win.
    pub fn changes(&self) -> &[StateChange] {
        &self.changes
    }

    pub fn notes(&self) -> &[TimingNote] {
        &self.notes
    }

    /// Distinct states in first-seen order.
    pub fn states(&self) -> Vec<&str> {
        let mut states: Vec<&str> = Vec::new();
        for state in self.changes.iter().filter_map(|c| c.state.as_deref()) {
            if !states.contains(&state) {
                states.push(state);
            }
        }
        states
    }

    fn set_state(&mut self, tick: i64, state: Option<String>) {
        match self.changes.iter().position(|c| c.tick >= tick) {
            Some(index) if self.changes[index].tick == tick => {
                self.changes[index].state = state;
            }
            Some(index) => self.changes.insert(index, StateChange { tick, state }),
            None => self.changes.push(StateChange { tick, state }),
        }
    }
}

/// A message arrow between two players.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMessage {
    pub from: Id,
    pub from_tick: i64,
    pub to: Id,
    pub to_tick: i64,
    pub label: Label,
}

/// The timing diagram aggregate.
#[derive(Debug, Clone, Default)]
pub struct TimingDiagram {
    pub(super) meta: DiagramMeta,
    players: IndexMap<Id, Player>,
    messages: Vec<TimeMessage>,
    now: i64,
    /// Pixels per tick.
    scale: Option<f32>,
    min_tick: Option<i64>,
    max_tick: Option<i64>,
}

impl TimingDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn players(&self) -> impl ExactSizeIterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, code: Id) -> Option<&Player> {
        self.players.get(&code)
    }

    pub fn messages(&self) -> &[TimeMessage] {
        &self.messages
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn scale(&self) -> Option<f32> {
        self.scale
    }

    /// Smallest and largest tick mentioned so far.
    pub fn tick_range(&self) -> Option<(i64, i64)> {
        self.min_tick.zip(self.max_tick)
    }

    /// # Errors
    ///
    /// Fails when a player with the same code already exists.
    pub fn add_player(&mut self, player: Player) -> Result<(), ModelError> {
        if self.players.contains_key(&player.code()) {
            return Err(ModelError::DuplicatePlayer(player.code().to_string()));
        }
        trace!(code:% = player.code(); "Adding player");
        self.players.insert(player.code(), player);
        Ok(())
    }

    pub fn set_now(&mut self, tick: i64) {
        self.now = tick;
        self.touch(tick);
    }

    pub fn advance(&mut self, ticks: i64) {
        self.set_now(self.now.saturating_add(ticks));
    }

    /// `pixels` pixels for every `ticks` ticks.
    pub fn set_scale(&mut self, ticks: i64, pixels: i64) {
        if ticks > 0 && pixels > 0 {
            self.scale = Some(pixels as f32 / ticks as f32);
        }
    }

    /// # Errors
    ///
    /// Fails for unknown players.
    pub fn set_state(&mut self, code: Id, state: Option<String>) -> Result<(), ModelError> {
        let now = self.now;
        let player = self
            .players
            .get_mut(&code)
            .ok_or_else(|| ModelError::UnknownParticipant(code.to_string()))?;
        player.set_state(now, state);
        self.touch(now);
        Ok(())
    }

    /// Attaches a note to a player at the current tick.
    ///
    /// # Errors
    ///
    /// Fails for unknown players.
    pub fn add_note(
        &mut self,
        code: Id,
        position: NotePosition,
        text: Label,
        stereotype: Option<Stereotype>,
        tags: Vec<String>,
    ) -> Result<(), ModelError> {
        let now = self.now;
        let player = self
            .players
            .get_mut(&code)
            .ok_or_else(|| ModelError::UnknownParticipant(code.to_string()))?;
        player
            .notes
            .push(TimingNote::new(now, position, text, stereotype, tags));
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when either end is not a known player.
    pub fn add_message(&mut self, message: TimeMessage) -> Result<(), ModelError> {
        for code in [message.from, message.to] {
            if !self.players.contains_key(&code) {
                return Err(ModelError::UnknownParticipant(code.to_string()));
            }
        }
        self.touch(message.from_tick);
        self.touch(message.to_tick);
        self.messages.push(message);
        Ok(())
    }

    fn touch(&mut self, tick: i64) {
        self.min_tick = Some(self.min_tick.map_or(tick, |min| min.min(tick)));
        self.max_tick = Some(self.max_tick.map_or(tick, |max| max.max(tick)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagram() -> TimingDiagram {
        let mut diagram = TimingDiagram::new();
        diagram
            .add_player(Player::new(
                Id::new("WB"),
                Label::plain("Web Browser"),
                PlayerKind::Robust,
            ))
            .unwrap();
        diagram
    }

    #[test]
    fn test_state_changes_are_sorted_by_tick() {
        let mut diagram = diagram();
        diagram.set_now(100);
        diagram.set_state(Id::new("WB"), Some("Idle".into())).unwrap();
        diagram.set_now(0);
        diagram
            .set_state(Id::new("WB"), Some("Waiting".into()))
            .unwrap();

        let ticks: Vec<i64> = diagram
            .player(Id::new("WB"))
            .unwrap()
            .changes()
            .iter()
            .map(|c| c.tick)
            .collect();
        assert_eq!(ticks, [0, 100]);
        assert_eq!(diagram.tick_range(), Some((0, 100)));
    }

    #[test]
    fn test_same_tick_overrides_state() {
        let mut diagram = diagram();
        diagram.set_state(Id::new("WB"), Some("A".into())).unwrap();
        diagram.set_state(Id::new("WB"), Some("B".into())).unwrap();
        let player = diagram.player(Id::new("WB")).unwrap();
        assert_eq!(player.changes().len(), 1);
        assert_eq!(player.states(), ["B"]);
    }

    #[test]
    fn test_note_at_current_tick() {
        let mut diagram = diagram();
        diagram.advance(50);
        diagram
            .add_note(
                Id::new("WB"),
                NotePosition::Top,
                Label::plain("loading"),
                None,
                Vec::new(),
            )
            .unwrap();
        let note = &diagram.player(Id::new("WB")).unwrap().notes()[0];
        assert_eq!(note.tick(), 50);
        assert_eq!(note.position(), NotePosition::Top);
    }

    #[test]
    fn test_duplicate_player() {
        let mut diagram = diagram();
        let err = diagram
            .add_player(Player::new(Id::new("WB"), Label::default(), PlayerKind::Concise))
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicatePlayer("WB".into()));
    }
}
