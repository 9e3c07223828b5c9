//! Sequence diagram layout.
//!
//! Participants are distributed horizontally with label-based spacing and
//! events are stacked vertically in source order. Activations are tracked
//! with a per-participant stack and turned into boxes when they close.

use log::{debug, trace};

use tracery_core::{
    color::Color,
    draw::{Drawable, StrokeDefinition, StrokeStyle},
    geometry::{Point, Size},
    identifier::Id,
    label::Label,
    model::{
        HasMeta, SequenceDiagram,
        sequence::{
            ArrowBody, ArrowConfig, ArrowHead as HeadKind, Event, ExoMessage, ExoType,
            LifeEvent, LifeEventKind, Message, Note as NoteEvent, NotePosition, Participant,
            ParticipantKind,
        },
    },
};

use super::{Layout, Theme};
use crate::{
    TraceryError,
    draw::{
        ACTIVATION_WIDTH, ActivationBox, Arrow, ArrowHead, Lifeline, Note, Shape, ShapeKind,
        TextBlock,
    },
};

const HEAD_GAP: f32 = 40.0;
const LABEL_MARGIN: f32 = 20.0;
const LABEL_GAP: f32 = 3.0;
const ROW_GAP: f32 = 12.0;
const SELF_WIDTH: f32 = 30.0;
const SELF_HEIGHT: f32 = 15.0;
const EXO_MARGIN: f32 = 30.0;
const NOTE_GAP: f32 = 10.0;
const END_MARGIN: f32 = 15.0;
const MIN_ACTIVATION: f32 = 15.0;
const DESTROY_SIZE: f32 = 9.0;

fn head_kind(kind: ParticipantKind) -> ShapeKind {
    match kind {
        ParticipantKind::Participant => ShapeKind::Rectangle,
        ParticipantKind::Actor => ShapeKind::Actor,
        ParticipantKind::Boundary | ParticipantKind::Control | ParticipantKind::Entity => {
            ShapeKind::Circle
        }
        ParticipantKind::Database => ShapeKind::Database,
        ParticipantKind::Collections => ShapeKind::Collections,
        ParticipantKind::Queue => ShapeKind::Rounded,
    }
}

fn head_shape(participant: &Participant, theme: &Theme) -> Shape {
    Shape::new(
        head_kind(participant.kind()),
        participant.display().lines().to_vec(),
        theme.text(),
    )
    .with_fill(participant.color().copied().or(theme.fill()))
    .with_stroke(theme.line())
}

/// Label lines of a message, prefixed with its autonumber.
fn message_lines(label: &Label, number: Option<u32>) -> Vec<String> {
    let mut lines = label.lines().to_vec();
    if let Some(number) = number {
        match lines.first_mut() {
            Some(first) => *first = format!("{number} {first}"),
            None => lines.push(number.to_string()),
        }
    }
    lines
}

fn arrow_heads(config: &ArrowConfig) -> (ArrowHead, ArrowHead) {
    let head = match config.head() {
        HeadKind::Normal => ArrowHead::Filled,
        HeadKind::Async => ArrowHead::Open,
        HeadKind::Cross => ArrowHead::Cross,
    };
    if config.is_bidirectional() {
        (head, head)
    } else {
        (ArrowHead::None, head)
    }
}

fn arrow_stroke(config: &ArrowConfig, theme: &Theme) -> StrokeDefinition {
    let mut stroke = theme.line();
    if let Some(color) = config.color() {
        stroke = stroke.with_color(*color);
    }
    if config.body() == ArrowBody::Dotted {
        stroke = stroke.with_style(StrokeStyle::Dashed);
    }
    stroke
}

/// Center x of every column.
///
/// `constraints` holds `(left, right, distance)` minimum center distances
/// between two columns. Columns right of a violated constraint are pushed
/// right, which never breaks a constraint that already holds.
fn column_positions(widths: &[f32], constraints: &mut [(usize, usize, f32)]) -> Vec<f32> {
    let mut positions = Vec::with_capacity(widths.len());
    for (index, width) in widths.iter().enumerate() {
        let x = match index {
            0 => width / 2.0,
            _ => positions[index - 1] + widths[index - 1] / 2.0 + HEAD_GAP + width / 2.0,
        };
        positions.push(x);
    }

    constraints.sort_by_key(|&(left, right, _)| (right, left));
    for &(left, right, distance) in constraints.iter() {
        let deficit = distance - (positions[right] - positions[left]);
        if deficit > 0.0 {
            for x in &mut positions[right..] {
                *x += deficit;
            }
        }
    }
    positions
}

struct Column {
    code: Id,
    x: f32,
    shape: Shape,
    size: Size,
    /// Center y of a head placed by `create`.
    created_at: Option<f32>,
    destroyed_at: Option<f32>,
    /// Start y and color of each open activation.
    activations: Vec<(f32, Option<Color>)>,
}

impl Column {
    fn depth(&self) -> usize {
        self.activations.len()
    }

    /// Distance from the lifeline to the edge of the activation boxes.
    fn edge_offset(&self) -> f32 {
        match self.depth() {
            0 => 0.0,
            depth => ACTIVATION_WIDTH / 2.0 + (depth - 1) as f32 * 4.0,
        }
    }
}

struct SequenceEngine<'a> {
    diagram: &'a SequenceDiagram,
    theme: &'a Theme,
    layout: Layout,
    columns: Vec<Column>,
    head_height: f32,
    left_x: f32,
    right_x: f32,
    y: f32,
    last_message_y: f32,
}

impl<'a> SequenceEngine<'a> {
    fn new(diagram: &'a SequenceDiagram, theme: &'a Theme) -> Result<Self, TraceryError> {
        let shapes: Vec<(Id, Shape)> = diagram
            .participants()
            .map(|participant| (participant.code(), head_shape(participant, theme)))
            .collect();
        let widths: Vec<f32> = shapes.iter().map(|(_, shape)| shape.size().width()).collect();
        let head_height = shapes
            .iter()
            .map(|(_, shape)| shape.size().height())
            .fold(0.0f32, f32::max);

        let mut engine = Self {
            diagram,
            theme,
            layout: Layout::new(),
            columns: Vec::with_capacity(shapes.len()),
            head_height,
            left_x: 0.0,
            right_x: 0.0,
            y: head_height,
            last_message_y: head_height,
        };

        let mut constraints = engine.spacing_constraints()?;
        let positions = column_positions(&widths, &mut constraints);
        for ((code, shape), x) in shapes.into_iter().zip(positions) {
            let size = shape.size();
            engine.columns.push(Column {
                code,
                x,
                shape,
                size,
                created_at: None,
                destroyed_at: None,
                activations: Vec::new(),
            });
        }
        engine.compute_edges();
        Ok(engine)
    }

    fn index(&self, code: Id) -> Result<usize, TraceryError> {
        self.diagram
            .participant_index(code)
            .ok_or_else(|| TraceryError::Layout(format!("Unknown participant `{code}`")))
    }

    fn text_size(&self, lines: Vec<String>) -> Size {
        TextBlock::new(self.theme.text(), lines).size()
    }

    /// Minimum center distances needed by message labels and side notes.
    fn spacing_constraints(&self) -> Result<Vec<(usize, usize, f32)>, TraceryError> {
        let count = self.diagram.participants().len();
        let mut constraints = Vec::new();
        for event in self.diagram.events() {
            match event {
                Event::Message(message) => {
                    let from = self.index(message.from())?;
                    let to = self.index(message.to())?;
                    let width = self
                        .text_size(message_lines(message.label(), message.number()))
                        .width();
                    if from == to {
                        if from + 1 < count {
                            constraints.push((
                                from,
                                from + 1,
                                SELF_WIDTH + width + LABEL_MARGIN + ACTIVATION_WIDTH,
                            ));
                        }
                    } else {
                        constraints.push((from.min(to), from.max(to), width + LABEL_MARGIN));
                    }
                }
                Event::Note(note) if note.participants().len() == 1 => {
                    let index = self.index(note.participants()[0])?;
                    let width = Note::new(note.text().lines().to_vec(), self.theme.text())
                        .size()
                        .width();
                    let distance = width + NOTE_GAP * 2.0 + ACTIVATION_WIDTH;
                    match note.position() {
                        NotePosition::Right if index + 1 < count => {
                            constraints.push((index, index + 1, distance));
                        }
                        NotePosition::Left if index > 0 => {
                            constraints.push((index - 1, index, distance));
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Ok(constraints)
    }

    /// Where exo arrows start or end.
    fn compute_edges(&mut self) {
        let (Some(first), Some(last)) = (self.columns.first(), self.columns.last()) else {
            return;
        };
        let mut left = first.x - first.size.width() / 2.0;
        let mut right = last.x + last.size.width() / 2.0;
        for event in self.diagram.events() {
            let Event::Exo(exo) = event else {
                continue;
            };
            let Some(index) = self.diagram.participant_index(exo.participant()) else {
                continue;
            };
            let x = self.columns[index].x;
            let width = self
                .text_size(message_lines(exo.label(), exo.number()))
                .width();
            if exo.exo_type().is_left() {
                left = left.min(x - width - LABEL_MARGIN);
            } else {
                right = right.max(x + width + LABEL_MARGIN);
            }
        }
        self.left_x = left - EXO_MARGIN;
        self.right_x = right + EXO_MARGIN;
    }

    fn run(mut self) -> Result<Layout, TraceryError> {
        let diagram = self.diagram;
        for event in diagram.events() {
            match event {
                Event::Message(message) => self.message(message)?,
                Event::Exo(exo) => self.exo(exo)?,
                Event::Life(life) => self.life(life)?,
                Event::Note(note) => self.note(note)?,
                Event::Divider(label) => self.divider(label),
                Event::Delay(label) => self.delay(label),
            }
        }
        self.finish();
        Ok(self.layout)
    }

    /// Reserves the row of a message and returns the y of its arrow.
    fn message_row(&mut self, label_height: f32, parallel: bool) -> f32 {
        if parallel {
            return self.last_message_y;
        }
        self.y += ROW_GAP + label_height + LABEL_GAP;
        self.y
    }

    fn push_label(&mut self, lines: Vec<String>, center: Point) {
        let label = TextBlock::new(self.theme.text(), lines);
        if !label.is_empty() {
            self.layout.push(label, center);
        }
    }

    fn message(&mut self, message: &Message) -> Result<(), TraceryError> {
        let from = self.index(message.from())?;
        let to = self.index(message.to())?;
        let lines = message_lines(message.label(), message.number());
        let label_size = self.text_size(lines.clone());
        let y = self.message_row(label_size.height(), message.is_parallel());
        let stroke = arrow_stroke(message.arrow(), self.theme);
        let (start_head, end_head) = arrow_heads(message.arrow());
        trace!(from:% = message.from(), to:% = message.to(), y; "Placing message");

        if from == to {
            let column = &self.columns[from];
            let x = column.x + column.edge_offset();
            let points = vec![
                Point::new(x, y),
                Point::new(x + SELF_WIDTH, y),
                Point::new(x + SELF_WIDTH, y + SELF_HEIGHT),
                Point::new(x, y + SELF_HEIGHT),
            ];
            self.layout
                .push_arrow(Arrow::new(points, stroke).with_heads(start_head, end_head));
            let center = Point::new(
                x + LABEL_GAP + label_size.width() / 2.0,
                y - LABEL_GAP - label_size.height() / 2.0,
            );
            self.push_label(lines, center);
            self.y = self.y.max(y + SELF_HEIGHT);
            self.last_message_y = y + SELF_HEIGHT;
            return Ok(());
        }

        let direction = if to > from { 1.0 } else { -1.0 };
        let start = self.columns[from].x + direction * self.columns[from].edge_offset();
        let end = self.columns[to].x - direction * self.columns[to].edge_offset();
        self.layout.push_arrow(
            Arrow::new(vec![Point::new(start, y), Point::new(end, y)], stroke)
                .with_heads(start_head, end_head),
        );
        let center = Point::new(
            (start + end) / 2.0,
            y - LABEL_GAP - label_size.height() / 2.0,
        );
        self.push_label(lines, center);
        self.last_message_y = y;
        Ok(())
    }

    fn exo(&mut self, exo: &ExoMessage) -> Result<(), TraceryError> {
        let index = self.index(exo.participant())?;
        let lines = message_lines(exo.label(), exo.number());
        let label_size = self.text_size(lines.clone());
        let y = self.message_row(label_size.height(), exo.is_parallel());

        let column = &self.columns[index];
        let (edge, side) = match exo.exo_type() {
            ExoType::FromLeft | ExoType::ToLeft => (self.left_x, -1.0),
            ExoType::FromRight | ExoType::ToRight => (self.right_x, 1.0),
        };
        let near = column.x + side * column.edge_offset();
        let (start, end) = if exo.exo_type().is_incoming() {
            (edge, near)
        } else {
            (near, edge)
        };
        let (start_head, end_head) = arrow_heads(exo.arrow());
        self.layout.push_arrow(
            Arrow::new(
                vec![Point::new(start, y), Point::new(end, y)],
                arrow_stroke(exo.arrow(), self.theme),
            )
            .with_heads(start_head, end_head),
        );
        let center = Point::new(
            (start + end) / 2.0,
            y - LABEL_GAP - label_size.height() / 2.0,
        );
        self.push_label(lines, center);
        self.last_message_y = y;
        Ok(())
    }

    fn close_activation(&mut self, index: usize, end: f32) {
        let column = &mut self.columns[index];
        let Some((start, color)) = column.activations.pop() else {
            return;
        };
        let nesting = column.activations.len() as u32;
        let end = if end <= start { start + MIN_ACTIVATION } else { end };
        let x = column.x;
        let activation = ActivationBox::new(end - start, nesting, self.theme.line())
            .with_fill(color);
        self.layout
            .push(activation, Point::new(x, (start + end) / 2.0));
    }

    fn life(&mut self, life: &LifeEvent) -> Result<(), TraceryError> {
        let index = self.index(life.participant())?;
        match life.kind() {
            LifeEventKind::Activate => {
                let start = self.last_message_y;
                self.columns[index]
                    .activations
                    .push((start, life.color().copied()));
            }
            LifeEventKind::Deactivate => self.close_activation(index, self.last_message_y),
            LifeEventKind::Destroy => {
                let y = self.last_message_y;
                while self.columns[index].depth() > 0 {
                    self.close_activation(index, y);
                }
                let x = self.columns[index].x;
                let stroke = self.theme.line();
                for (dx, dy) in [(1.0, 1.0), (1.0, -1.0)] {
                    let points = vec![
                        Point::new(x - DESTROY_SIZE * dx, y - DESTROY_SIZE * dy),
                        Point::new(x + DESTROY_SIZE * dx, y + DESTROY_SIZE * dy),
                    ];
                    self.layout.push_arrow(Arrow::new(points, stroke.clone()));
                }
                self.columns[index].destroyed_at = Some(y);
            }
            LifeEventKind::Create => {
                let height = self.columns[index].size.height();
                self.y += ROW_GAP;
                let center = self.y + height / 2.0;
                self.columns[index].created_at = Some(center);
                self.y += height;
                self.last_message_y = center;
            }
        }
        Ok(())
    }

    fn note(&mut self, note: &NoteEvent) -> Result<(), TraceryError> {
        let Some(&first) = note.participants().first() else {
            return Ok(());
        };
        let first = self.index(first)?;
        let last = match note.participants().last() {
            Some(&code) => self.index(code)?,
            None => first,
        };
        let drawable = Note::new(note.text().lines().to_vec(), self.theme.text())
            .with_fill(note.color().copied().or(self.theme.note_fill()))
            .with_stroke(self.theme.line());
        let size = drawable.size();
        let column = &self.columns[first];
        let x = match note.position() {
            NotePosition::Left => column.x - column.edge_offset() - NOTE_GAP - size.width() / 2.0,
            NotePosition::Right => column.x + column.edge_offset() + NOTE_GAP + size.width() / 2.0,
            NotePosition::Over => (column.x + self.columns[last].x) / 2.0,
        };
        self.y += ROW_GAP;
        self.layout
            .push(drawable, Point::new(x, self.y + size.height() / 2.0));
        self.y += size.height();
        Ok(())
    }

    fn divider(&mut self, label: &Label) {
        let box_shape = Shape::new(ShapeKind::Rectangle, label.lines().to_vec(), self.theme.text())
            .with_fill(self.theme.fill())
            .with_stroke(self.theme.line());
        let size = box_shape.size();
        self.y += ROW_GAP;
        let center_y = self.y + size.height() / 2.0;
        for offset in [-1.5, 1.5] {
            let points = vec![
                Point::new(self.left_x, center_y + offset),
                Point::new(self.right_x, center_y + offset),
            ];
            self.layout.push_arrow(Arrow::new(points, self.theme.line()));
        }
        if !label.is_empty() {
            let center_x = (self.left_x + self.right_x) / 2.0;
            self.layout.push(box_shape, Point::new(center_x, center_y));
        }
        self.y += size.height();
    }

    fn delay(&mut self, label: &Label) {
        let size = self.text_size(label.lines().to_vec());
        self.y += ROW_GAP * 2.0;
        let center = Point::new(
            (self.left_x + self.right_x) / 2.0,
            self.y + size.height() / 2.0,
        );
        let text = TextBlock::new(self.theme.text().with_italic(true), label.lines().to_vec());
        if !text.is_empty() {
            self.layout.push(text, center);
        }
        self.y += size.height() + ROW_GAP;
    }

    fn finish(&mut self) {
        let end = self.y + END_MARGIN;
        for index in 0..self.columns.len() {
            while self.columns[index].depth() > 0 {
                self.close_activation(index, end - END_MARGIN / 2.0);
            }
        }

        let show_footbox = !matches!(self.diagram.meta().skin_param("footbox"), Some("hide"));
        for column in &self.columns {
            let head_center = column
                .created_at
                .unwrap_or(self.head_height - column.size.height() / 2.0);
            let top = head_center + column.size.height() / 2.0;
            let bottom = column.destroyed_at.unwrap_or(end);
            let lifeline = Lifeline::new(bottom - top, self.theme.dashed_line());
            let center = Point::new(column.x, (top + bottom) / 2.0);
            self.layout.push(lifeline, center);
            self.layout
                .push(column.shape.clone(), Point::new(column.x, head_center));

            if show_footbox && column.destroyed_at.is_none() {
                let foot = Point::new(column.x, end + column.size.height() / 2.0);
                self.layout.push(column.shape.clone(), foot);
            }
        }
        debug!(
            participants = self.columns.len(),
            height = end;
            "Sequence layout finished"
        );
    }
}

/// Lays out a sequence diagram.
///
/// # Errors
///
/// Fails when an event refers to a participant the diagram does not
/// declare.
pub fn layout(diagram: &SequenceDiagram, theme: &Theme) -> Result<Layout, TraceryError> {
    SequenceEngine::new(diagram, theme)?.run()
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn participant(code: &str) -> Participant {
        Participant::new(Id::new(code), Label::default(), ParticipantKind::Participant)
    }

    fn message(from: &str, to: &str, label: &str) -> Event {
        Event::Message(Message::new(
            Id::new(from),
            Id::new(to),
            Label::with_newlines(label),
            ArrowConfig::default(),
            None,
        ))
    }

    fn diagram_with(codes: &[&str]) -> SequenceDiagram {
        let mut diagram = SequenceDiagram::new();
        for code in codes {
            diagram.declare_participant(participant(code));
        }
        diagram
    }

    fn svg(layout: &Layout) -> String {
        layout
            .render()
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    #[test]
    fn test_column_positions_respect_constraints() {
        let widths = [40.0, 40.0, 40.0];
        let mut constraints = vec![(0, 2, 300.0), (0, 1, 200.0)];
        let positions = column_positions(&widths, &mut constraints);
        assert_approx_eq!(f32, positions[0], 20.0);
        assert_approx_eq!(f32, positions[1], 220.0);
        assert_approx_eq!(f32, positions[2], 320.0);
    }

    #[test]
    fn test_message_label_pushes_columns_apart() {
        let mut short = diagram_with(&["A", "B"]);
        short.add_message(message("A", "B", "x")).unwrap();
        let mut long = diagram_with(&["A", "B"]);
        long.add_message(message("A", "B", "a very long message label indeed"))
            .unwrap();

        let theme = Theme::default();
        let short_width = layout(&short, &theme).unwrap().bounds().width();
        let long_width = layout(&long, &theme).unwrap().bounds().width();
        assert!(long_width > short_width);
    }

    #[test]
    fn test_heads_lifelines_and_footbox() {
        let mut diagram = diagram_with(&["A", "B"]);
        diagram.add_message(message("A", "B", "hello")).unwrap();

        let layout = layout(&diagram, &Theme::default()).unwrap();
        // arrow, label, then lifeline + head + foot per participant
        assert_eq!(layout.len(), 2 + 2 * 3);
        let svg = svg(&layout);
        assert!(svg.contains("hello"));
        assert!(svg.contains("data-layer=\"track\""));
    }

    #[test]
    fn test_hidden_footbox() {
        let mut diagram = diagram_with(&["A"]);
        diagram
            .meta_mut()
            .skin_params
            .insert("footbox".to_string(), "hide".to_string());
        let layout = layout(&diagram, &Theme::default()).unwrap();
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_activation_becomes_a_box() {
        let mut diagram = diagram_with(&["A", "B"]);
        diagram.add_message(message("A", "B", "call")).unwrap();
        diagram
            .activate(Id::new("B"), LifeEventKind::Activate, None)
            .unwrap();
        diagram.add_message(message("B", "A", "done")).unwrap();
        diagram
            .activate(Id::new("B"), LifeEventKind::Deactivate, None)
            .unwrap();

        let svg = svg(&layout(&diagram, &Theme::default()).unwrap());
        assert_eq!(svg.matches("data-layer=\"activation\"").count(), 1);
    }

    #[test]
    fn test_autonumber_prefixes_label() {
        assert_eq!(
            message_lines(&Label::with_newlines("hi"), Some(3)),
            ["3 hi"]
        );
        assert_eq!(message_lines(&Label::default(), Some(7)), ["7"]);
    }

    #[test]
    fn test_self_message_and_notes() {
        let mut diagram = diagram_with(&["A"]);
        diagram.add_message(message("A", "A", "think")).unwrap();
        diagram.add_note(NoteEvent::new(
            vec![Id::new("A")],
            NotePosition::Right,
            Label::with_newlines("a note"),
            None,
        ));
        diagram.add_divider(Label::with_newlines("phase 2"));
        diagram.add_delay(Label::with_newlines("later"));

        let svg = svg(&layout(&diagram, &Theme::default()).unwrap());
        assert!(svg.contains("data-layer=\"note\""));
        assert!(svg.contains("phase 2"));
        assert!(svg.contains("font-style=\"italic\""));
    }
}
