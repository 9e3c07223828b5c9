//! Railroad diagrams for EBNF rules.
//!
//! Each expression becomes a [`Track`] with its entry and exit on a common
//! baseline. Sequences run horizontally, alternatives are stacked under
//! the first branch, optional parts get a bypass above and repetitions a
//! loop back underneath.

use log::debug;

use tracery_core::{
    draw::Drawable,
    geometry::Point,
    model::{EbnfDiagram, EbnfExpr, EbnfRule},
};

use super::{Layout, Theme};
use crate::draw::{Arrow, ArrowHead, Shape, ShapeKind, TextBlock};

/// Horizontal room used by the connectors of a branch.
const ARC: f32 = 20.0;
const GAP: f32 = 12.0;
const VGAP: f32 = 10.0;
const RULE_GAP: f32 = 25.0;
const LEAD: f32 = 15.0;
const BAR: f32 = 6.0;

/// Extent of a track around its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Metrics {
    width: f32,
    up: f32,
    down: f32,
}

impl Metrics {
    fn height(&self) -> f32 {
        self.up + self.down
    }
}

#[derive(Debug)]
enum TrackKind {
    Node(Shape),
    Sequence(Vec<Track>),
    Choice(Vec<Track>),
    Optional(Box<Track>),
    Loop { inner: Box<Track>, skippable: bool },
}

#[derive(Debug)]
struct Track {
    kind: TrackKind,
    metrics: Metrics,
}

impl Track {
    fn build(expr: &EbnfExpr, theme: &Theme) -> Self {
        let node = |kind, text: String| {
            let shape = Shape::new(kind, [text], theme.text())
                .with_fill(theme.fill())
                .with_stroke(theme.line());
            let size = shape.size();
            let metrics = Metrics {
                width: size.width(),
                up: size.height() / 2.0,
                down: size.height() / 2.0,
            };
            Self {
                kind: TrackKind::Node(shape),
                metrics,
            }
        };

        match expr {
            EbnfExpr::Identifier(name) => node(ShapeKind::Rectangle, name.clone()),
            EbnfExpr::Terminal(text) => node(ShapeKind::Rounded, text.clone()),
            EbnfExpr::Special(text) => node(ShapeKind::Rectangle, format!("? {text} ?")),
            EbnfExpr::Sequence(items) => {
                let items: Vec<Track> = items.iter().map(|item| Self::build(item, theme)).collect();
                let width = items.iter().map(|item| item.metrics.width).sum::<f32>()
                    + GAP * items.len().saturating_sub(1) as f32;
                let metrics = Metrics {
                    width: width.max(GAP),
                    up: items.iter().map(|item| item.metrics.up).fold(0.0, f32::max),
                    down: items.iter().map(|item| item.metrics.down).fold(0.0, f32::max),
                };
                Self {
                    kind: TrackKind::Sequence(items),
                    metrics,
                }
            }
            EbnfExpr::Alternation(items) => {
                let items: Vec<Track> = items.iter().map(|item| Self::build(item, theme)).collect();
                let widest = items.iter().map(|item| item.metrics.width).fold(0.0, f32::max);
                let (up, mut down) = items
                    .first()
                    .map_or((0.0, 0.0), |first| (first.metrics.up, first.metrics.down));
                for item in items.iter().skip(1) {
                    down += VGAP + item.metrics.height();
                }
                Self {
                    kind: TrackKind::Choice(items),
                    metrics: Metrics {
                        width: widest + ARC * 2.0,
                        up,
                        down,
                    },
                }
            }
            EbnfExpr::Optional(inner) => {
                let inner = Self::build(inner, theme);
                let metrics = Metrics {
                    width: inner.metrics.width + ARC * 2.0,
                    up: inner.metrics.up + VGAP,
                    down: inner.metrics.down,
                };
                Self {
                    kind: TrackKind::Optional(Box::new(inner)),
                    metrics,
                }
            }
            EbnfExpr::ZeroOrMore(inner) | EbnfExpr::OneOrMore(inner) => {
                let skippable = matches!(expr, EbnfExpr::ZeroOrMore(_));
                let inner = Self::build(inner, theme);
                let metrics = Metrics {
                    width: inner.metrics.width + ARC * 2.0,
                    up: inner.metrics.up + if skippable { VGAP } else { 0.0 },
                    down: inner.metrics.down + VGAP,
                };
                Self {
                    kind: TrackKind::Loop {
                        inner: Box::new(inner),
                        skippable,
                    },
                    metrics,
                }
            }
        }
    }

    /// Draws the track with its entry at `(x, y)`.
    fn render(self, layout: &mut Layout, theme: &Theme, x: f32, y: f32) {
        let Metrics { width, up, .. } = self.metrics;
        let line = |points: Vec<Point>| Arrow::new(points, theme.line());

        match self.kind {
            TrackKind::Node(shape) => {
                layout.push(shape, Point::new(x + width / 2.0, y));
            }
            TrackKind::Sequence(items) => {
                let mut cursor = x;
                let count = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let item_width = item.metrics.width;
                    item.render(layout, theme, cursor, y);
                    cursor += item_width;
                    if index + 1 < count {
                        layout.push_arrow(line(vec![
                            Point::new(cursor, y),
                            Point::new(cursor + GAP, y),
                        ]));
                        cursor += GAP;
                    }
                }
                if count == 0 {
                    layout.push_arrow(line(vec![Point::new(x, y), Point::new(x + width, y)]));
                }
            }
            TrackKind::Choice(items) => {
                let (left, right) = (x + ARC / 2.0, x + width - ARC / 2.0);
                let mut branch_y = y;
                let mut previous_down = 0.0;
                for (index, item) in items.into_iter().enumerate() {
                    let Metrics {
                        width: item_width,
                        up: item_up,
                        down: item_down,
                    } = item.metrics;
                    if index > 0 {
                        branch_y += previous_down + VGAP + item_up;
                    }
                    previous_down = item_down;
                    let start = x + ARC;
                    let end = start + item_width;
                    if index == 0 {
                        layout.push_arrow(line(vec![Point::new(x, y), Point::new(start, y)]));
                        layout.push_arrow(line(vec![Point::new(end, y), Point::new(x + width, y)]));
                    } else {
                        layout.push_arrow(line(vec![
                            Point::new(left, y),
                            Point::new(left, branch_y),
                            Point::new(start, branch_y),
                        ]));
                        layout.push_arrow(line(vec![
                            Point::new(end, branch_y),
                            Point::new(right, branch_y),
                            Point::new(right, y),
                        ]));
                    }
                    item.render(layout, theme, start, branch_y);
                }
            }
            TrackKind::Optional(inner) => {
                let top = y - up;
                render_bypass(layout, theme, x, y, width, top);
                render_framed(*inner, layout, theme, x, y, width);
            }
            TrackKind::Loop { inner, skippable } => {
                let bottom = y + inner.metrics.down + VGAP;
                if skippable {
                    render_bypass(layout, theme, x, y, width, y - up);
                }
                layout.push_arrow(
                    line(vec![
                        Point::new(x + width - ARC / 2.0, y),
                        Point::new(x + width - ARC / 2.0, bottom),
                        Point::new(x + ARC / 2.0, bottom),
                        Point::new(x + ARC / 2.0, y),
                    ])
                    .with_heads(ArrowHead::None, ArrowHead::Filled),
                );
                render_framed(*inner, layout, theme, x, y, width);
            }
        }
    }
}

/// Renders `inner` between two `ARC` long connectors.
fn render_framed(inner: Track, layout: &mut Layout, theme: &Theme, x: f32, y: f32, width: f32) {
    let start = x + ARC;
    let end = start + inner.metrics.width;
    layout.push_arrow(Arrow::new(vec![Point::new(x, y), Point::new(start, y)], theme.line()));
    layout.push_arrow(Arrow::new(
        vec![Point::new(end, y), Point::new(x + width, y)],
        theme.line(),
    ));
    inner.render(layout, theme, start, y);
}

fn render_bypass(layout: &mut Layout, theme: &Theme, x: f32, y: f32, width: f32, top: f32) {
    let (left, right) = (x + ARC / 2.0, x + width - ARC / 2.0);
    layout.push_arrow(Arrow::new(
        vec![
            Point::new(left, y),
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, y),
        ],
        theme.line(),
    ));
}

/// Lays out one rule with its top-left corner at `(0, top)` and returns
/// the bottom of what was drawn.
fn rule(layout: &mut Layout, theme: &Theme, rule: &EbnfRule, top: f32) -> f32 {
    let mut y = top;
    if let Some(comment) = rule.comment() {
        let text = TextBlock::new(theme.small_text().with_italic(true), [comment.to_string()]);
        let size = text.size();
        layout.push(text, Point::new(size.width() / 2.0, y + size.height() / 2.0));
        y += size.height();
    }

    let name = TextBlock::new(theme.text().with_bold(true), [rule.name().to_string()]);
    let name_size = name.size();
    layout.push(
        name,
        Point::new(name_size.width() / 2.0, y + name_size.height() / 2.0),
    );
    y += name_size.height() + VGAP;

    let track = Track::build(rule.expr(), theme);
    let metrics = track.metrics;
    let baseline = y + metrics.up;
    let start = LEAD;
    let end = start + LEAD + metrics.width;

    for bar_x in [start, end + LEAD] {
        layout.push_arrow(Arrow::new(
            vec![
                Point::new(bar_x, baseline - BAR),
                Point::new(bar_x, baseline + BAR),
            ],
            theme.line(),
        ));
    }
    layout.push_arrow(Arrow::new(
        vec![Point::new(start, baseline), Point::new(start + LEAD, baseline)],
        theme.line(),
    ));
    layout.push_arrow(
        Arrow::new(
            vec![Point::new(end, baseline), Point::new(end + LEAD, baseline)],
            theme.line(),
        )
        .with_heads(ArrowHead::None, ArrowHead::Filled),
    );
    track.render(layout, theme, start + LEAD, baseline);

    baseline + metrics.down
}

/// Lays out every rule of an EBNF diagram, one under the other.
pub fn layout(diagram: &EbnfDiagram, theme: &Theme) -> Layout {
    let mut layout = Layout::new();
    let mut y = 0.0;
    for ebnf_rule in diagram.rules() {
        y = rule(&mut layout, theme, ebnf_rule, y) + RULE_GAP;
    }
    debug!(rules = diagram.rules().len(), height = y; "Railroad layout finished");
    layout
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn terminal(text: &str) -> EbnfExpr {
        EbnfExpr::Terminal(text.to_string())
    }

    fn metrics(expr: &EbnfExpr) -> Metrics {
        Track::build(expr, &Theme::default()).metrics
    }

    #[test]
    fn test_sequence_is_horizontal() {
        let a = metrics(&terminal("a"));
        let seq = metrics(&EbnfExpr::Sequence(vec![terminal("a"), terminal("a")]));
        assert_approx_eq!(f32, seq.width, a.width * 2.0 + GAP);
        assert_approx_eq!(f32, seq.height(), a.height());
    }

    #[test]
    fn test_alternatives_are_stacked() {
        let a = metrics(&terminal("a"));
        let choice = metrics(&EbnfExpr::Alternation(vec![terminal("a"), terminal("a")]));
        assert_approx_eq!(f32, choice.up, a.up);
        assert_approx_eq!(f32, choice.height(), a.height() * 2.0 + VGAP);
        assert_approx_eq!(f32, choice.width, a.width + ARC * 2.0);
    }

    #[test]
    fn test_optional_and_repetition_reserve_room() {
        let a = metrics(&terminal("a"));
        let optional = metrics(&EbnfExpr::Optional(Box::new(terminal("a"))));
        assert_approx_eq!(f32, optional.up, a.up + VGAP);
        assert_approx_eq!(f32, optional.down, a.down);

        let many = metrics(&EbnfExpr::OneOrMore(Box::new(terminal("a"))));
        assert_approx_eq!(f32, many.up, a.up);
        assert_approx_eq!(f32, many.down, a.down + VGAP);

        let any = metrics(&EbnfExpr::ZeroOrMore(Box::new(terminal("a"))));
        assert_approx_eq!(f32, any.up, a.up + VGAP);
    }

    #[test]
    fn test_rules_are_stacked() {
        let mut diagram = EbnfDiagram::new();
        diagram
            .add_rule(EbnfRule::new(
                "digit",
                EbnfExpr::Alternation(vec![terminal("0"), terminal("1")]),
            ))
            .unwrap();
        diagram.push_comment("numbers");
        diagram
            .add_rule(EbnfRule::new(
                "number",
                EbnfExpr::OneOrMore(Box::new(EbnfExpr::Identifier("digit".to_string()))),
            ))
            .unwrap();

        let layout = layout(&diagram, &Theme::default());
        let svg: String = layout
            .render()
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect();
        for text in ["digit", "number", "numbers", ">0<", ">1<"] {
            assert!(svg.contains(text), "missing {text}");
        }
        assert!(svg.contains("font-weight=\"bold\""));
    }
}
