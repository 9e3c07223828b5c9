//! Sticky notes with a folded corner.

use svg::node::element as svg_element;

use tracery_core::{
    apply_stroke,
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition, Text, TextAnchor, TextStyle},
    geometry::{Insets, Point, Size},
};

const FOLD: f32 = 8.0;
const PADDING: Insets = Insets::new(5.0, 12.0, 5.0, 8.0);
const DEFAULT_FILL: &str = "#FBFB77";

#[derive(Debug, Clone)]
pub struct Note {
    lines: Vec<String>,
    style: TextStyle,
    fill: Option<Color>,
    stroke: StrokeDefinition,
}

impl Note {
    pub fn new(lines: impl IntoIterator<Item = String>, style: TextStyle) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            style: style.with_anchor(TextAnchor::Start),
            fill: None,
            stroke: StrokeDefinition::default(),
        }
    }

    pub fn with_fill(mut self, fill: Option<Color>) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, stroke: StrokeDefinition) -> Self {
        self.stroke = stroke;
        self
    }
}

impl Drawable for Note {
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let bounds = position.to_bounds(self.size());
        let (x, y) = (bounds.min_x(), bounds.min_y());
        let (right, bottom) = (bounds.max_x(), bounds.max_y());

        let outline = format!(
            "M {x} {y} L {} {y} L {right} {} L {right} {bottom} L {x} {bottom} Z",
            right - FOLD,
            y + FOLD,
        );
        let fill: svg::node::Value = match &self.fill {
            Some(color) => color.into(),
            None => DEFAULT_FILL.into(),
        };
        let outline = apply_stroke!(
            svg_element::Path::new().set("d", outline).set("fill", fill),
            &self.stroke
        );
        let corner = format!(
            "M {} {y} L {} {} L {right} {}",
            right - FOLD,
            right - FOLD,
            y + FOLD,
            y + FOLD,
        );
        let corner = apply_stroke!(
            svg_element::Path::new().set("d", corner).set("fill", "none"),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Note, Box::new(outline));
        output.add_to_layer(RenderLayer::Note, Box::new(corner));

        let text = Text::from_lines(&self.style, &self.lines);
        output.merge(text.render_to_layers(Point::new(x + PADDING.left(), bounds.center().y())));
        output
    }

    fn size(&self) -> Size {
        self.style
            .measure(self.lines.iter().map(String::as_str))
            .add_padding(PADDING)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_size_includes_padding() {
        let style = TextStyle::default();
        let note = Note::new(["remember".to_string()], style.clone());
        assert_approx_eq!(
            f32,
            note.size().width(),
            style.measure_line("remember") + PADDING.horizontal_sum()
        );
    }

    #[test]
    fn test_renders_on_note_layer() {
        let note = Note::new(["a".to_string(), "b".to_string()], TextStyle::default());
        let svg: String = note
            .render_to_layers(Point::new(50.0, 50.0))
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect();
        assert!(svg.contains("data-layer=\"note\""));
        assert!(svg.contains(DEFAULT_FILL));
        assert_eq!(svg.matches("<tspan").count(), 2);
    }
}
