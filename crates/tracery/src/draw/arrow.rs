//! Polyline arrows with heads drawn inline.
//!
//! Heads are plain polygons and paths instead of `<marker>` definitions so
//! the document never depends on a marker registry.

use svg::node::element as svg_element;

use tracery_core::{
    apply_stroke,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::{Bounds, Point, Size},
};

const HEAD_LENGTH: f32 = 10.0;
const HEAD_HALF_WIDTH: f32 = 4.0;
const TRIANGLE_LENGTH: f32 = 12.0;
const TRIANGLE_HALF_WIDTH: f32 = 6.0;
const DIAMOND_LENGTH: f32 = 16.0;
const CROSS_SIZE: f32 = 5.0;

/// Decoration drawn at one end of an arrow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrowHead {
    #[default]
    None,
    /// Closed filled head of synchronous messages.
    Filled,
    /// Two open strokes, for asynchronous messages and dependencies.
    Open,
    /// An `x` marking a lost or destroying message.
    Cross,
    /// Hollow triangle of generalization.
    Triangle,
    /// Filled diamond of composition.
    FilledDiamond,
    /// Hollow diamond of aggregation.
    Diamond,
}

#[derive(Debug, Clone)]
pub struct Arrow {
    points: Vec<Point>,
    stroke: StrokeDefinition,
    start: ArrowHead,
    end: ArrowHead,
}

impl Arrow {
    /// Creates an arrow through `points`, given in absolute coordinates.
    pub fn new(points: Vec<Point>, stroke: StrokeDefinition) -> Self {
        Self {
            points,
            stroke,
            start: ArrowHead::None,
            end: ArrowHead::None,
        }
    }

    pub fn with_heads(mut self, start: ArrowHead, end: ArrowHead) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn points_bounds(&self) -> Bounds {
        let mut points = self.points.iter();
        let Some(first) = points.next() else {
            return Bounds::default();
        };
        points.fold(first.to_bounds(Size::default()), |bounds, point| {
            bounds.merge(&point.to_bounds(Size::default()))
        })
    }

    /// The position at which the arrow renders at its own coordinates.
    pub fn center(&self) -> Point {
        self.points_bounds().center()
    }

    fn render_head(&self, head: ArrowHead, tip: Point, from: Point, output: &mut LayeredOutput) {
        let delta = tip.sub_point(from);
        let length = delta.hypot();
        if length == 0.0 || head == ArrowHead::None {
            return;
        }
        let dir = Point::new(delta.x() / length, delta.y() / length);
        let normal = Point::new(-dir.y(), dir.x());
        let at = |back: f32, side: f32| {
            Point::new(
                tip.x() - dir.x() * back + normal.x() * side,
                tip.y() - dir.y() * back + normal.y() * side,
            )
        };
        let color = self.stroke.color();

        let node: Box<dyn svg::Node> = match head {
            ArrowHead::None => return,
            ArrowHead::Filled => Box::new(apply_stroke!(
                svg_element::Polygon::new()
                    .set(
                        "points",
                        polygon_points(&[
                            tip,
                            at(HEAD_LENGTH, HEAD_HALF_WIDTH),
                            at(HEAD_LENGTH, -HEAD_HALF_WIDTH)
                        ])
                    )
                    .set("fill", &color),
                &self.stroke
            )),
            ArrowHead::Open => Box::new(apply_stroke!(
                svg_element::Polyline::new()
                    .set(
                        "points",
                        polygon_points(&[
                            at(HEAD_LENGTH, HEAD_HALF_WIDTH),
                            tip,
                            at(HEAD_LENGTH, -HEAD_HALF_WIDTH)
                        ])
                    )
                    .set("fill", "none"),
                &self.stroke
            )),
            ArrowHead::Cross => {
                let a = at(CROSS_SIZE * 2.0, CROSS_SIZE);
                let b = at(0.0, -CROSS_SIZE);
                let c = at(CROSS_SIZE * 2.0, -CROSS_SIZE);
                let d = at(0.0, CROSS_SIZE);
                let path = format!(
                    "M {} {} L {} {} M {} {} L {} {}",
                    a.x(),
                    a.y(),
                    b.x(),
                    b.y(),
                    c.x(),
                    c.y(),
                    d.x(),
                    d.y()
                );
                Box::new(apply_stroke!(
                    svg_element::Path::new().set("d", path).set("fill", "none"),
                    &self.stroke
                ))
            }
            ArrowHead::Triangle => Box::new(apply_stroke!(
                svg_element::Polygon::new()
                    .set(
                        "points",
                        polygon_points(&[
                            tip,
                            at(TRIANGLE_LENGTH, TRIANGLE_HALF_WIDTH),
                            at(TRIANGLE_LENGTH, -TRIANGLE_HALF_WIDTH)
                        ])
                    )
                    .set("fill", "white"),
                &self.stroke
            )),
            ArrowHead::FilledDiamond | ArrowHead::Diamond => {
                let fill: svg::node::Value = if head == ArrowHead::FilledDiamond {
                    (&color).into()
                } else {
                    "white".into()
                };
                Box::new(apply_stroke!(
                    svg_element::Polygon::new()
                        .set(
                            "points",
                            polygon_points(&[
                                tip,
                                at(DIAMOND_LENGTH / 2.0, HEAD_HALF_WIDTH),
                                at(DIAMOND_LENGTH, 0.0),
                                at(DIAMOND_LENGTH / 2.0, -HEAD_HALF_WIDTH)
                            ])
                        )
                        .set("fill", fill),
                    &self.stroke
                ))
            }
        };
        output.add_to_layer(RenderLayer::Arrow, node);
    }
}

fn polygon_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x(), p.y()))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Drawable for Arrow {
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        if self.points.len() < 2 {
            return output;
        }
        let offset = position.sub_point(self.center());
        let points: Vec<Point> = self.points.iter().map(|p| p.add_point(offset)).collect();

        let line = apply_stroke!(
            svg_element::Polyline::new()
                .set("points", polygon_points(&points))
                .set("fill", "none"),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Arrow, Box::new(line));

        let last = points.len() - 1;
        self.render_head(self.start, points[0], points[1], &mut output);
        self.render_head(self.end, points[last], points[last - 1], &mut output);
        output
    }

    fn size(&self) -> Size {
        self.points_bounds().to_size()
    }
}

#[cfg(test)]
mod tests {
    use tracery_core::color::Color;

    use super::*;

    fn render(arrow: &Arrow) -> String {
        arrow
            .render_to_layers(arrow.center())
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    fn straight() -> Arrow {
        Arrow::new(
            vec![Point::new(0.0, 10.0), Point::new(100.0, 10.0)],
            StrokeDefinition::default(),
        )
    }

    #[test]
    fn test_plain_line() {
        let svg = render(&straight());
        assert!(svg.contains("points=\"0,10 100,10\""));
        assert!(!svg.contains("<polygon"));
    }

    #[test]
    fn test_filled_head_points_at_the_end() {
        let svg = render(&straight().with_heads(ArrowHead::None, ArrowHead::Filled));
        assert!(svg.contains("points=\"100,10 90,14 90,6\""));
    }

    #[test]
    fn test_heads_follow_direction() {
        let arrow = Arrow::new(
            vec![Point::new(10.0, 0.0), Point::new(10.0, 50.0)],
            StrokeDefinition::default(),
        )
        .with_heads(ArrowHead::Triangle, ArrowHead::None);
        let svg = render(&arrow);
        assert!(svg.contains("points=\"10,0 16,12 4,12\""));
        assert!(svg.contains("fill=\"white\""));
    }

    #[test]
    fn test_dotted_colored_stroke() {
        let stroke = StrokeDefinition::dotted(Color::new("red").unwrap(), 1.0);
        let arrow = Arrow::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 20.0)], stroke)
            .with_heads(ArrowHead::None, ArrowHead::Open);
        let svg = render(&arrow);
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("<polyline"));
    }

    #[test]
    fn test_size_spans_points() {
        let arrow = Arrow::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(40.0, 30.0),
            ],
            StrokeDefinition::default(),
        );
        assert_eq!(arrow.size(), Size::new(40.0, 30.0));
        assert_eq!(arrow.center(), Point::new(20.0, 15.0));
    }

    #[test]
    fn test_single_point_renders_nothing() {
        let arrow = Arrow::new(vec![Point::new(0.0, 0.0)], StrokeDefinition::default());
        assert!(arrow.render_to_layers(Point::default()).is_empty());
    }
}
