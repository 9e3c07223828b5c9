//! Timing diagram layout.
//!
//! Every player gets a horizontal row; rows share one time axis drawn
//! underneath. Robust and binary players are step lines over their state
//! levels, concise players are a strip of labeled segments and clocks are
//! square waves.

use log::{debug, warn};

use tracery_core::{
    draw::{Drawable, TextAnchor},
    geometry::Point,
    identifier::Id,
    model::{
        TimingDiagram,
        timing::{NotePosition, Player, PlayerKind, StateChange},
    },
};

use super::{Layout, Theme};
use crate::draw::{Arrow, ArrowHead, Note, TextBlock};

const NAME_GAP: f32 = 10.0;
const ROW_PADDING: f32 = 10.0;
const ROW_GAP: f32 = 10.0;
const STATE_STEP: f32 = 20.0;
const SEGMENT_HEIGHT: f32 = 24.0;
const SEGMENT_SLANT: f32 = 3.0;
const WAVE_HEIGHT: f32 = 20.0;
const NOTE_GAP: f32 = 6.0;
const AXIS_GAP: f32 = 15.0;
const TICK_LENGTH: f32 = 4.0;
const TAIL: f32 = 40.0;
const MIN_STEP: f32 = 60.0;
const MAX_AXIS: f32 = 1200.0;
/// Square waves stop after this many periods.
const MAX_CLOCK_CYCLES: usize = 10_000;

/// Maps ticks to x coordinates.
#[derive(Debug, Clone, Copy)]
struct Axis {
    origin: f32,
    first: i64,
    last: i64,
    scale: f32,
}

impl Axis {
    fn x(&self, tick: i64) -> f32 {
        self.origin + tick.saturating_sub(self.first) as f32 * self.scale
    }

    fn end(&self) -> f32 {
        self.x(self.last) + TAIL
    }
}

/// Pixels per tick when the diagram does not set a scale: the closest
/// pair of ticks is `MIN_STEP` apart unless that makes the axis too long.
fn default_scale(ticks: &[i64]) -> f32 {
    let Some(gap) = ticks
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]))
        .filter(|gap| *gap > 0)
        .min()
    else {
        return 1.0;
    };
    let span = ticks[ticks.len() - 1].saturating_sub(ticks[0]) as f32;
    (MIN_STEP / gap as f32).min(MAX_AXIS / span)
}

/// Every tick mentioned by the diagram, sorted and deduplicated.
fn collect_ticks(diagram: &TimingDiagram) -> Vec<i64> {
    let mut ticks: Vec<i64> = Vec::new();
    for player in diagram.players() {
        ticks.extend(player.changes().iter().map(|change| change.tick));
        ticks.extend(player.notes().iter().map(|note| note.tick()));
    }
    for message in diagram.messages() {
        ticks.extend([message.from_tick, message.to_tick]);
    }
    if let Some((min, max)) = diagram.tick_range() {
        ticks.extend([min, max]);
    }
    ticks.sort_unstable();
    ticks.dedup();
    ticks
}

fn is_high(state: &str) -> bool {
    state.eq_ignore_ascii_case("high") || state == "1"
}

/// Corner points of a clock's square wave between `first` and `last`.
fn clock_points(
    (period, pulse, offset): (i64, i64, i64),
    axis: &Axis,
    first: i64,
    last: i64,
    (high, low): (f32, f32),
) -> Vec<Point> {
    if period <= 0 || last <= first {
        return vec![Point::new(axis.x(first), low), Point::new(axis.x(last), low)];
    }
    let pulse = if pulse > 0 && pulse < period {
        pulse
    } else {
        (period / 2).max(1)
    };
    let level = |tick: i64| {
        if tick.saturating_sub(offset).rem_euclid(period) < pulse {
            high
        } else {
            low
        }
    };

    let mut edges = vec![first];
    let mut cycle = first.saturating_sub(offset).div_euclid(period);
    for _ in 0..MAX_CLOCK_CYCLES {
        let Some(rise) = cycle
            .checked_mul(period)
            .and_then(|start| start.checked_add(offset))
        else {
            break;
        };
        if rise >= last {
            break;
        }
        for tick in [rise, rise.saturating_add(pulse)] {
            if tick > first && tick < last {
                edges.push(tick);
            }
        }
        cycle += 1;
    }

    let mut points = vec![Point::new(axis.x(first), level(first))];
    let mut current = level(first);
    for &tick in &edges[1..] {
        let x = axis.x(tick);
        points.push(Point::new(x, current));
        current = level(tick);
        points.push(Point::new(x, current));
    }
    points.push(Point::new(axis.x(last), current));
    points
}

/// Start and end x of every state change.
fn spans<'c>(
    changes: &'c [StateChange],
    axis: Axis,
) -> impl Iterator<Item = (f32, f32, Option<&'c str>)> {
    changes.iter().enumerate().map(move |(index, change)| {
        let end = changes
            .get(index + 1)
            .map_or(axis.end(), |next| axis.x(next.tick));
        (axis.x(change.tick), end, change.state.as_deref())
    })
}

/// Vertical extent of one player row.
#[derive(Debug, Clone, Copy)]
struct Row {
    top: f32,
    height: f32,
}

impl Row {
    fn center(&self) -> f32 {
        self.top + self.height / 2.0
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

struct TimingEngine<'a> {
    diagram: &'a TimingDiagram,
    theme: &'a Theme,
    layout: Layout,
    axis: Axis,
    name_width: f32,
}

impl<'a> TimingEngine<'a> {
    fn new(diagram: &'a TimingDiagram, theme: &'a Theme) -> Self {
        let mut ticks = collect_ticks(diagram);
        if ticks.is_empty() {
            ticks.push(diagram.now());
        }
        let first = ticks[0];
        let mut last = ticks[ticks.len() - 1];
        for player in diagram.players() {
            if let PlayerKind::Clock { period, .. } = player.kind() {
                last = last.max(first.saturating_add(period.saturating_mul(2)));
            }
        }

        let name_width = diagram
            .players()
            .map(|player| {
                TextBlock::new(theme.text(), player.display().lines().to_vec())
                    .size()
                    .width()
            })
            .fold(0.0f32, f32::max);
        let state_width = diagram
            .players()
            .filter(|player| player.kind() == PlayerKind::Robust)
            .flat_map(|player| player.states())
            .map(|state| theme.small_text().measure_line(state))
            .fold(0.0f32, f32::max);
        let state_column = if state_width > 0.0 {
            state_width + NAME_GAP
        } else {
            0.0
        };

        let scale = diagram.scale().unwrap_or_else(|| default_scale(&ticks));
        let axis = Axis {
            origin: name_width + NAME_GAP + state_column,
            first,
            last,
            scale,
        };
        debug!(first, last, scale; "Timing axis");

        Self {
            diagram,
            theme,
            layout: Layout::new(),
            axis,
            name_width,
        }
    }

    fn body_height(player: &Player) -> f32 {
        match player.kind() {
            PlayerKind::Robust => player.states().len().max(1) as f32 * STATE_STEP,
            PlayerKind::Concise => SEGMENT_HEIGHT,
            PlayerKind::Binary | PlayerKind::Clock { .. } => WAVE_HEIGHT,
        }
    }

    fn note_height(&self, player: &Player, position: NotePosition) -> f32 {
        player
            .notes()
            .iter()
            .filter(|note| note.position() == position)
            .map(|note| {
                Note::new(note.text().lines().to_vec(), self.theme.text())
                    .size()
                    .height()
                    + NOTE_GAP
            })
            .fold(0.0f32, f32::max)
    }

    fn run(mut self) -> Layout {
        let diagram = self.diagram;
        let mut y = 0.0;
        let mut rows = Vec::with_capacity(diagram.players().len());
        for player in diagram.players() {
            let top_notes = self.note_height(player, NotePosition::Top);
            let row = Row {
                top: y + top_notes,
                height: Self::body_height(player) + ROW_PADDING * 2.0,
            };
            self.player(player, row);
            y = row.bottom() + self.note_height(player, NotePosition::Bottom) + ROW_GAP;
            rows.push((player.code(), row));
        }

        for message in diagram.messages() {
            let find = |code: Id| rows.iter().find(|(id, _)| *id == code).map(|(_, row)| *row);
            let (Some(from), Some(to)) = (find(message.from), find(message.to)) else {
                warn!(from:% = message.from, to:% = message.to; "Skipping message between unknown players");
                continue;
            };
            let start = Point::new(self.axis.x(message.from_tick), from.center());
            let end = Point::new(self.axis.x(message.to_tick), to.center());
            self.layout.push_arrow(
                Arrow::new(vec![start, end], self.theme.line())
                    .with_heads(ArrowHead::None, ArrowHead::Filled),
            );
            let label = TextBlock::new(self.theme.small_text(), message.label.lines().to_vec());
            if !label.is_empty() {
                let center = start.midpoint(end);
                let above = center.y() - label.size().height() / 2.0 - 2.0;
                self.layout.push(label, center.with_y(above));
            }
        }

        self.time_axis(y + AXIS_GAP);
        self.layout
    }

    fn player(&mut self, player: &Player, row: Row) {
        let name = TextBlock::new(self.theme.text(), player.display().lines().to_vec());
        let name_x = self.name_width - name.size().width() / 2.0;
        self.layout.push(name, Point::new(name_x, row.center()));

        let body_top = row.top + ROW_PADDING;
        let body_bottom = row.bottom() - ROW_PADDING;
        match player.kind() {
            PlayerKind::Robust => self.robust(player, body_top),
            PlayerKind::Binary => self.binary(player, body_top, body_bottom),
            PlayerKind::Concise => self.concise(player, body_top, body_bottom),
            PlayerKind::Clock {
                period,
                pulse,
                offset,
            } => {
                let points = clock_points(
                    (period, pulse, offset),
                    &self.axis,
                    self.axis.first,
                    self.axis.last,
                    (body_top, body_bottom),
                );
                self.layout.push_arrow(Arrow::new(points, self.theme.line()));
            }
        }

        for note in player.notes() {
            let drawable = Note::new(note.text().lines().to_vec(), self.theme.text())
                .with_fill(self.theme.note_fill())
                .with_stroke(self.theme.line());
            let size = drawable.size();
            let x = self.axis.x(note.tick()) + size.width() / 2.0;
            let y = match note.position() {
                NotePosition::Top => row.top - NOTE_GAP - size.height() / 2.0,
                NotePosition::Bottom => row.bottom() + NOTE_GAP + size.height() / 2.0,
            };
            self.layout.push(drawable, Point::new(x, y));
        }
    }

    /// Draws a step line; `level` gives the y of a visible state.
    fn step_line(&mut self, changes: &[StateChange], level: impl Fn(&str) -> f32) {
        let mut run: Vec<Point> = Vec::new();
        for (start, end, state) in spans(changes, self.axis) {
            match state {
                Some(state) => {
                    let y = level(state);
                    let jumps = run.last().is_none_or(|last| (last.y() - y).abs() > f32::EPSILON);
                    if jumps {
                        run.push(Point::new(start, y));
                    }
                    run.push(Point::new(end, y));
                }
                None => self.flush_run(&mut run),
            }
        }
        self.flush_run(&mut run);
    }

    fn flush_run(&mut self, run: &mut Vec<Point>) {
        if run.len() >= 2 {
            self.layout
                .push_arrow(Arrow::new(std::mem::take(run), self.theme.line()));
        }
        run.clear();
    }

    fn robust(&mut self, player: &Player, top: f32) {
        let states = player.states();
        let level_of = |state: &str| {
            let index = states.iter().position(|s| *s == state).unwrap_or(0);
            top + STATE_STEP / 2.0 + index as f32 * STATE_STEP
        };

        let style = self.theme.small_text().with_anchor(TextAnchor::End);
        let label_x = self.axis.origin - NAME_GAP / 2.0;
        for state in &states {
            let label = TextBlock::new(style.clone(), [state.to_string()]);
            let center_x = label_x - label.size().width() / 2.0;
            self.layout.push(label, Point::new(center_x, level_of(state)));
        }
        self.step_line(player.changes(), level_of);
    }

    fn binary(&mut self, player: &Player, high: f32, low: f32) {
        self.step_line(player.changes(), |state| if is_high(state) { high } else { low });
    }

    fn concise(&mut self, player: &Player, top: f32, bottom: f32) {
        let middle = (top + bottom) / 2.0;
        for (start, end, state) in spans(player.changes(), self.axis) {
            let Some(state) = state else {
                let points = vec![Point::new(start, middle), Point::new(end, middle)];
                self.layout.push_arrow(Arrow::new(points, self.theme.dashed_line()));
                continue;
            };
            let slant = SEGMENT_SLANT.min((end - start) / 2.0);
            let outline = vec![
                Point::new(start, middle),
                Point::new(start + slant, top),
                Point::new(end - slant, top),
                Point::new(end, middle),
                Point::new(end - slant, bottom),
                Point::new(start + slant, bottom),
                Point::new(start, middle),
            ];
            self.layout.push_arrow(Arrow::new(outline, self.theme.line()));
            let label = TextBlock::new(self.theme.small_text(), [state.to_string()]);
            self.layout
                .push(label, Point::new((start + end) / 2.0, middle));
        }
    }

    fn time_axis(&mut self, y: f32) {
        let line = vec![Point::new(self.axis.origin, y), Point::new(self.axis.end(), y)];
        self.layout.push_arrow(Arrow::new(line, self.theme.line()));

        let mut ticks = collect_ticks(self.diagram);
        ticks.retain(|tick| *tick <= self.axis.last);
        for tick in ticks {
            let x = self.axis.x(tick);
            let mark = vec![Point::new(x, y - TICK_LENGTH), Point::new(x, y + TICK_LENGTH)];
            self.layout.push_arrow(Arrow::new(mark, self.theme.line()));
            let label = TextBlock::new(self.theme.small_text(), [tick.to_string()]);
            let center_y = y + TICK_LENGTH + 2.0 + label.size().height() / 2.0;
            self.layout.push(label, Point::new(x, center_y));
        }
    }
}

/// Lays out a timing diagram.
pub fn layout(diagram: &TimingDiagram, theme: &Theme) -> Layout {
    TimingEngine::new(diagram, theme).run()
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use tracery_core::{label::Label, model::timing::TimeMessage};

    use super::*;

    fn axis() -> Axis {
        Axis {
            origin: 0.0,
            first: 0,
            last: 20,
            scale: 1.0,
        }
    }

    fn svg(layout: &Layout) -> String {
        layout
            .render()
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    fn web_browser() -> TimingDiagram {
        let mut diagram = TimingDiagram::new();
        diagram
            .add_player(Player::new(
                Id::new("WB"),
                Label::plain("Web Browser"),
                PlayerKind::Robust,
            ))
            .unwrap();
        diagram
            .add_player(Player::new(Id::new("WU"), Label::plain("User"), PlayerKind::Concise))
            .unwrap();
        diagram.set_now(0);
        diagram.set_state(Id::new("WB"), Some("Idle".to_string())).unwrap();
        diagram.set_state(Id::new("WU"), Some("Waiting".to_string())).unwrap();
        diagram.set_now(100);
        diagram
            .set_state(Id::new("WB"), Some("Processing".to_string()))
            .unwrap();
        diagram
    }

    #[test]
    fn test_default_scale_spaces_closest_ticks() {
        assert_approx_eq!(f32, default_scale(&[0, 100, 300]), 0.6);
        assert_approx_eq!(f32, default_scale(&[5]), 1.0);
        // 60 px per tick would make the axis 60000 px long
        assert_approx_eq!(f32, default_scale(&[0, 1, 1000]), 1.2);
    }

    #[test]
    fn test_clock_wave_edges() {
        let points = clock_points((10, 0, 0), &axis(), 0, 20, (0.0, 20.0));
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(points[1], Point::new(5.0, 0.0));
        assert_eq!(points[2], Point::new(5.0, 20.0));
        assert_eq!(points[7], Point::new(20.0, 20.0));
    }

    #[test]
    fn test_clock_with_offset_starts_low() {
        let points = clock_points((10, 2, 3), &axis(), 0, 20, (0.0, 20.0));
        assert_eq!(points[0], Point::new(0.0, 20.0));
        assert_eq!(points[1], Point::new(3.0, 20.0));
        assert_eq!(points[2], Point::new(3.0, 0.0));
    }

    #[test]
    fn test_extreme_ticks_stay_on_a_bounded_axis() {
        let mut diagram = web_browser();
        diagram
            .add_player(Player::new(
                Id::new("CLK"),
                Label::plain("clk"),
                PlayerKind::Clock {
                    period: 1,
                    pulse: 0,
                    offset: 0,
                },
            ))
            .unwrap();
        diagram.set_now(i64::MIN);
        diagram.set_state(Id::new("WB"), Some("Idle".to_string())).unwrap();
        diagram.set_now(i64::MAX);
        diagram.set_state(Id::new("WB"), Some("Done".to_string())).unwrap();

        let width = layout(&diagram, &Theme::default()).bounds().width();
        assert!(width.is_finite());
        assert!(width < 2.0 * MAX_AXIS);
    }

    #[test]
    fn test_binary_levels() {
        assert!(is_high("high"));
        assert!(is_high("HIGH"));
        assert!(is_high("1"));
        assert!(!is_high("low"));
    }

    #[test]
    fn test_robust_and_concise_rows() {
        let layout = layout(&web_browser(), &Theme::default());
        let svg = svg(&layout);
        for text in ["Web Browser", "User", "Idle", "Processing", "Waiting", "100"] {
            assert!(svg.contains(text), "missing {text}");
        }
    }

    #[test]
    fn test_scale_from_diagram() {
        let mut diagram = web_browser();
        diagram.set_scale(100, 50);
        let narrow = layout(&diagram, &Theme::default()).bounds().width();
        diagram.set_scale(100, 500);
        let wide = layout(&diagram, &Theme::default()).bounds().width();
        assert_approx_eq!(f32, wide - narrow, 450.0, epsilon = 0.01);
    }

    #[test]
    fn test_messages_and_notes() {
        let mut diagram = web_browser();
        diagram
            .add_message(TimeMessage {
                from: Id::new("WU"),
                from_tick: 0,
                to: Id::new("WB"),
                to_tick: 100,
                label: Label::plain("URL"),
            })
            .unwrap();
        diagram
            .add_note(
                Id::new("WB"),
                NotePosition::Top,
                Label::plain("busy"),
                None,
                Vec::new(),
            )
            .unwrap();

        let svg = svg(&layout(&diagram, &Theme::default()));
        assert!(svg.contains("URL"));
        assert!(svg.contains("busy"));
        assert!(svg.contains("data-layer=\"note\""));
        assert!(svg.contains("<polygon"));
    }
}
