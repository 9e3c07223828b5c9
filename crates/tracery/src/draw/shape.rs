//! Boxes, figures and class compartments with centered labels.

use svg::node::element as svg_element;

use tracery_core::{
    apply_stroke,
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition, Text, TextAnchor, TextStyle},
    geometry::{Bounds, Insets, Point, Size},
};

const PADDING: Insets = Insets::new(6.0, 10.0, 6.0, 10.0);
const MIN_WIDTH: f32 = 40.0;
const ACTOR_HEIGHT: f32 = 45.0;
const ACTOR_WIDTH: f32 = 30.0;
const CIRCLE_DIAMETER: f32 = 20.0;
const FIGURE_GAP: f32 = 4.0;
const COMPONENT_TAB: f32 = 6.0;
const NODE_DEPTH: f32 = 8.0;
const DATABASE_CAP: f32 = 10.0;
const COLLECTIONS_OFFSET: f32 = 4.0;
const MARKER_DIAMETER: f32 = 18.0;
const DEFAULT_FILL: &str = "#FEFECE";

/// The outline drawn around (or above) a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Rounded,
    Actor,
    /// A small circle with the label underneath.
    Circle,
    Database,
    Component,
    Node,
    Collections,
    /// A class box: marker letter and name, then the members.
    Class { marker: char },
}

#[derive(Debug, Clone)]
pub struct Shape {
    kind: ShapeKind,
    title: Vec<String>,
    members: Vec<String>,
    style: TextStyle,
    fill: Option<Color>,
    stroke: StrokeDefinition,
}

impl Shape {
    pub fn new(kind: ShapeKind, title: impl IntoIterator<Item = String>, style: TextStyle) -> Self {
        Self {
            kind,
            title: title.into_iter().collect(),
            members: Vec::new(),
            style,
            fill: None,
            stroke: StrokeDefinition::default(),
        }
    }

    /// Prepends a `«stereotype»` line to the title.
    pub fn with_stereotype(mut self, stereotype: Option<String>) -> Self {
        if let Some(stereotype) = stereotype {
            self.title.insert(0, stereotype);
        }
        self
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }

    pub fn with_fill(mut self, fill: Option<Color>) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, stroke: StrokeDefinition) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    fn title_size(&self) -> Size {
        self.style.measure(self.title.iter().map(String::as_str))
    }

    fn members_size(&self) -> Size {
        self.style.measure(self.members.iter().map(String::as_str))
    }

    fn header_height(&self) -> f32 {
        self.title_size().height().max(MARKER_DIAMETER) + PADDING.vertical_sum()
    }

    fn members_height(&self) -> f32 {
        if self.members.is_empty() {
            PADDING.vertical_sum()
        } else {
            self.members_size().height() + PADDING.vertical_sum()
        }
    }

    fn title_text(&self) -> Text<'_> {
        Text::from_lines(&self.style, &self.title)
    }

    fn render_outline(&self, bounds: Bounds, output: &mut LayeredOutput) {
        let (x, y, w, h) = (bounds.min_x(), bounds.min_y(), bounds.width(), bounds.height());
        match self.kind {
            ShapeKind::Rectangle | ShapeKind::Class { .. } => {
                output.add_to_layer(RenderLayer::Content, Box::new(self.rect(x, y, w, h)));
            }
            ShapeKind::Rounded => {
                let rect = self.rect(x, y, w, h).set("rx", 8.0).set("ry", 8.0);
                output.add_to_layer(RenderLayer::Content, Box::new(rect));
            }
            ShapeKind::Collections => {
                let back = self.rect(
                    x + COLLECTIONS_OFFSET,
                    y,
                    w - COLLECTIONS_OFFSET,
                    h - COLLECTIONS_OFFSET,
                );
                let front = self.rect(
                    x,
                    y + COLLECTIONS_OFFSET,
                    w - COLLECTIONS_OFFSET,
                    h - COLLECTIONS_OFFSET,
                );
                output.add_to_layer(RenderLayer::Content, Box::new(back));
                output.add_to_layer(RenderLayer::Content, Box::new(front));
            }
            ShapeKind::Component => {
                let body = self.rect(x + COMPONENT_TAB, y, w - COMPONENT_TAB, h);
                output.add_to_layer(RenderLayer::Content, Box::new(body));
                for fraction in [1.0 / 3.0, 2.0 / 3.0] {
                    let tab = self.rect(
                        x,
                        y + h * fraction - COMPONENT_TAB / 2.0,
                        COMPONENT_TAB * 2.0,
                        COMPONENT_TAB,
                    );
                    output.add_to_layer(RenderLayer::Content, Box::new(tab));
                }
            }
            ShapeKind::Node => {
                let d = NODE_DEPTH;
                let front = self.rect(x, y + d, w - d, h - d);
                let top = self.polygon(&[
                    Point::new(x, y + d),
                    Point::new(x + d, y),
                    Point::new(x + w, y),
                    Point::new(x + w - d, y + d),
                ]);
                let side = self.polygon(&[
                    Point::new(x + w - d, y + d),
                    Point::new(x + w, y),
                    Point::new(x + w, y + h - d),
                    Point::new(x + w - d, y + h),
                ]);
                output.add_to_layer(RenderLayer::Content, Box::new(front));
                output.add_to_layer(RenderLayer::Content, Box::new(top));
                output.add_to_layer(RenderLayer::Content, Box::new(side));
            }
            ShapeKind::Database => {
                let rx = w / 2.0;
                let body = format!(
                    "M {x} {top} L {x} {bottom} A {rx} {cap} 0 0 0 {right} {bottom} L {right} {top}",
                    top = y + DATABASE_CAP,
                    bottom = y + h - DATABASE_CAP,
                    right = x + w,
                    cap = DATABASE_CAP,
                );
                let body = apply_stroke!(
                    svg_element::Path::new().set("d", body).set("fill", self.fill_value()),
                    &self.stroke
                );
                let lid = apply_stroke!(
                    svg_element::Ellipse::new()
                        .set("cx", x + rx)
                        .set("cy", y + DATABASE_CAP)
                        .set("rx", rx)
                        .set("ry", DATABASE_CAP)
                        .set("fill", self.fill_value()),
                    &self.stroke
                );
                output.add_to_layer(RenderLayer::Content, Box::new(body));
                output.add_to_layer(RenderLayer::Content, Box::new(lid));
            }
            ShapeKind::Actor => {
                let cx = bounds.center().x();
                let head = apply_stroke!(
                    svg_element::Circle::new()
                        .set("cx", cx)
                        .set("cy", y + 8.0)
                        .set("r", 7.0)
                        .set("fill", self.fill_value()),
                    &self.stroke
                );
                let body = format!(
                    "M {cx} {} L {cx} {} M {} {} L {} {} M {} {} L {cx} {} L {} {}",
                    y + 15.0,
                    y + 32.0,
                    cx - 12.0,
                    y + 22.0,
                    cx + 12.0,
                    y + 22.0,
                    cx - 10.0,
                    y + ACTOR_HEIGHT,
                    y + 32.0,
                    cx + 10.0,
                    y + ACTOR_HEIGHT,
                );
                let body = apply_stroke!(
                    svg_element::Path::new().set("d", body).set("fill", "none"),
                    &self.stroke
                );
                output.add_to_layer(RenderLayer::Content, Box::new(head));
                output.add_to_layer(RenderLayer::Content, Box::new(body));
            }
            ShapeKind::Circle => {
                let circle = apply_stroke!(
                    svg_element::Circle::new()
                        .set("cx", bounds.center().x())
                        .set("cy", y + CIRCLE_DIAMETER / 2.0)
                        .set("r", CIRCLE_DIAMETER / 2.0)
                        .set("fill", self.fill_value()),
                    &self.stroke
                );
                output.add_to_layer(RenderLayer::Content, Box::new(circle));
            }
        }
    }

    fn fill_value(&self) -> svg::node::Value {
        match &self.fill {
            Some(color) => color.into(),
            None => DEFAULT_FILL.into(),
        }
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32) -> svg_element::Rectangle {
        apply_stroke!(
            svg_element::Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", width)
                .set("height", height)
                .set("fill", self.fill_value()),
            &self.stroke
        )
    }

    fn polygon(&self, points: &[Point]) -> svg_element::Polygon {
        let points = points
            .iter()
            .map(|p| format!("{},{}", p.x(), p.y()))
            .collect::<Vec<_>>()
            .join(" ");
        apply_stroke!(
            svg_element::Polygon::new()
                .set("points", points)
                .set("fill", self.fill_value()),
            &self.stroke
        )
    }

    /// Center of the area holding the title.
    fn title_center(&self, bounds: Bounds) -> Point {
        let center = bounds.center();
        match self.kind {
            ShapeKind::Actor => {
                let text_height = self.title_size().height();
                center.with_y(bounds.min_y() + ACTOR_HEIGHT + FIGURE_GAP + text_height / 2.0)
            }
            ShapeKind::Circle => {
                let text_height = self.title_size().height();
                center.with_y(bounds.min_y() + CIRCLE_DIAMETER + FIGURE_GAP + text_height / 2.0)
            }
            ShapeKind::Component => center.with_x(center.x() + COMPONENT_TAB / 2.0),
            ShapeKind::Node => Point::new(
                center.x() - NODE_DEPTH / 2.0,
                center.y() + NODE_DEPTH / 2.0,
            ),
            ShapeKind::Collections => Point::new(
                center.x() - COLLECTIONS_OFFSET / 2.0,
                center.y() + COLLECTIONS_OFFSET / 2.0,
            ),
            ShapeKind::Database => center.with_y(center.y() + DATABASE_CAP / 2.0),
            ShapeKind::Class { .. } => Point::new(
                center.x() + (MARKER_DIAMETER + FIGURE_GAP) / 2.0,
                bounds.min_y() + self.header_height() / 2.0,
            ),
            ShapeKind::Rectangle | ShapeKind::Rounded => center,
        }
    }

    fn render_class_parts(&self, marker: char, bounds: Bounds, output: &mut LayeredOutput) {
        let header_height = self.header_height();
        let title_width = self.title_size().width();
        let marker_x = bounds.center().x() - (MARKER_DIAMETER + FIGURE_GAP + title_width) / 2.0
            + MARKER_DIAMETER / 2.0;
        let marker_y = bounds.min_y() + header_height / 2.0;

        let circle = apply_stroke!(
            svg_element::Circle::new()
                .set("cx", marker_x)
                .set("cy", marker_y)
                .set("r", MARKER_DIAMETER / 2.0)
                .set("fill", marker_color(marker)),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Content, Box::new(circle));

        let letter_style = self.style.clone().with_bold(true);
        let letter = marker.to_string();
        output.merge(Text::new(&letter_style, &letter).render_to_layers(Point::new(marker_x, marker_y)));

        let separator_y = bounds.min_y() + header_height;
        let separator = apply_stroke!(
            svg_element::Line::new()
                .set("x1", bounds.min_x())
                .set("y1", separator_y)
                .set("x2", bounds.max_x())
                .set("y2", separator_y),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Content, Box::new(separator));

        if !self.members.is_empty() {
            let member_style = self.style.clone().with_anchor(TextAnchor::Start);
            let members = Text::from_lines(&member_style, &self.members);
            let position = Point::new(
                bounds.min_x() + PADDING.left(),
                separator_y + self.members_height() / 2.0,
            );
            output.merge(members.render_to_layers(position));
        }
    }
}

fn marker_color(marker: char) -> &'static str {
    match marker {
        'A' => "#A9DCDF",
        'I' => "#B4A7E5",
        'E' => "#EB937F",
        '@' => "#E3664A",
        _ => "#ADD1B2",
    }
}

impl Drawable for Shape {
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let bounds = position.to_bounds(self.size());

        self.render_outline(bounds, &mut output);
        if let ShapeKind::Class { marker } = self.kind {
            self.render_class_parts(marker, bounds, &mut output);
        }

        let title = self.title_text();
        if !title.is_empty() {
            output.merge(title.render_to_layers(self.title_center(bounds)));
        }
        output
    }

    fn size(&self) -> Size {
        let title = self.title_size();
        match self.kind {
            ShapeKind::Actor => Size::new(
                title.width().max(ACTOR_WIDTH),
                ACTOR_HEIGHT + FIGURE_GAP + title.height(),
            ),
            ShapeKind::Circle => Size::new(
                title.width().max(CIRCLE_DIAMETER),
                CIRCLE_DIAMETER + FIGURE_GAP + title.height(),
            ),
            ShapeKind::Class { .. } => {
                let header_width = MARKER_DIAMETER + FIGURE_GAP + title.width();
                let width = header_width.max(self.members_size().width()) + PADDING.horizontal_sum();
                Size::new(width.max(MIN_WIDTH), self.header_height() + self.members_height())
            }
            _ => {
                let extra = match self.kind {
                    ShapeKind::Component => Size::new(COMPONENT_TAB, 0.0),
                    ShapeKind::Node => Size::new(NODE_DEPTH, NODE_DEPTH),
                    ShapeKind::Collections => Size::new(COLLECTIONS_OFFSET, COLLECTIONS_OFFSET),
                    ShapeKind::Database => Size::new(0.0, DATABASE_CAP * 2.0),
                    _ => Size::default(),
                };
                let size = title.add_padding(PADDING);
                Size::new(
                    (size.width() + extra.width()).max(MIN_WIDTH),
                    size.height() + extra.height(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn render(shape: &Shape) -> String {
        shape
            .render_to_layers(Point::new(100.0, 100.0))
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    #[test]
    fn test_rectangle_fits_its_label() {
        let style = TextStyle::default();
        let shape = Shape::new(ShapeKind::Rectangle, ["A fairly long name".to_string()], style.clone());
        let size = shape.size();
        assert_approx_eq!(
            f32,
            size.width(),
            style.measure_line("A fairly long name") + PADDING.horizontal_sum()
        );
        assert_approx_eq!(f32, size.height(), style.line_height() + PADDING.vertical_sum());
    }

    #[test]
    fn test_short_labels_use_min_width() {
        let shape = Shape::new(ShapeKind::Rounded, ["a".to_string()], TextStyle::default());
        assert_approx_eq!(f32, shape.size().width(), MIN_WIDTH);
        assert!(render(&shape).contains("rx=\"8\""));
    }

    #[test]
    fn test_stereotype_adds_a_line() {
        let style = TextStyle::default();
        let plain = Shape::new(ShapeKind::Rectangle, ["A".to_string()], style.clone());
        let stereo = plain.clone().with_stereotype(Some("\u{ab}svc\u{bb}".to_string()));
        assert_approx_eq!(
            f32,
            stereo.size().height() - plain.size().height(),
            style.line_height()
        );
    }

    #[test]
    fn test_actor_label_sits_under_the_figure() {
        let shape = Shape::new(ShapeKind::Actor, ["User".to_string()], TextStyle::default());
        assert!(shape.size().height() > ACTOR_HEIGHT);
        let svg = render(&shape);
        assert!(svg.contains("<circle"));
        assert!(svg.contains("User"));
    }

    #[test]
    fn test_class_renders_marker_and_members() {
        let shape = Shape::new(ShapeKind::Class { marker: 'C' }, ["Car".to_string()], TextStyle::default())
            .with_members(vec!["+wheels : int".to_string(), "+drive()".to_string()]);
        let svg = render(&shape);
        assert!(svg.contains("#ADD1B2"));
        assert!(svg.contains("+drive()"));
        assert!(svg.contains("<line"));
    }

    #[test]
    fn test_every_kind_renders_content() {
        for kind in [
            ShapeKind::Rectangle,
            ShapeKind::Rounded,
            ShapeKind::Actor,
            ShapeKind::Circle,
            ShapeKind::Database,
            ShapeKind::Component,
            ShapeKind::Node,
            ShapeKind::Collections,
            ShapeKind::Class { marker: 'I' },
        ] {
            let shape = Shape::new(kind, ["x".to_string()], TextStyle::default());
            assert!(render(&shape).contains("data-layer=\"content\""), "{kind:?}");
        }
    }
}
