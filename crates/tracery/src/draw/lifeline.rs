//! Lifelines of sequence diagram participants.
//!
//! A lifeline stores only its height; the position given at render time is
//! its center, like every other drawable.

use svg::node::element as svg_element;

use tracery_core::{
    apply_stroke,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::{Point, Size},
};

/// A vertical dashed line.
#[derive(Debug, Clone)]
pub struct Lifeline {
    height: f32,
    stroke: StrokeDefinition,
}

impl Lifeline {
    pub fn new(height: f32, stroke: StrokeDefinition) -> Self {
        Self {
            height: height.max(0.0),
            stroke,
        }
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

impl Drawable for Lifeline {
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let half = self.height / 2.0;
        let line = apply_stroke!(
            svg_element::Line::new()
                .set("x1", position.x())
                .set("y1", position.y() - half)
                .set("x2", position.x())
                .set("y2", position.y() + half),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Track, Box::new(line));
        output
    }

    fn size(&self) -> Size {
        Size::new(0.0, self.height)
    }
}
