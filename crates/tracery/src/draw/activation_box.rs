//! Activation boxes drawn over lifelines.
//!
//! Nested activations of the same participant shift right by
//! [`NESTING_OFFSET`] per level.

use svg::node::element as svg_element;

use tracery_core::{
    apply_stroke,
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::{Point, Size},
};

pub const ACTIVATION_WIDTH: f32 = 10.0;
pub const NESTING_OFFSET: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct ActivationBox {
    height: f32,
    nesting_level: u32,
    fill: Option<Color>,
    stroke: StrokeDefinition,
}

impl ActivationBox {
    pub fn new(height: f32, nesting_level: u32, stroke: StrokeDefinition) -> Self {
        Self {
            height,
            nesting_level,
            fill: None,
            stroke,
        }
    }

    pub fn with_fill(mut self, fill: Option<Color>) -> Self {
        self.fill = fill;
        self
    }

    pub fn nesting_level(&self) -> u32 {
        self.nesting_level
    }

    /// Horizontal shift from the lifeline for this nesting level.
    pub fn offset(&self) -> f32 {
        self.nesting_level as f32 * NESTING_OFFSET
    }
}

impl Drawable for ActivationBox {
    /// `position` is the lifeline point at the vertical center; the nesting
    /// offset is applied here.
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let fill: svg::node::Value = match &self.fill {
            Some(color) => color.into(),
            None => "white".into(),
        };
        let rect = apply_stroke!(
            svg_element::Rectangle::new()
                .set("x", position.x() + self.offset() - ACTIVATION_WIDTH / 2.0)
                .set("y", position.y() - self.height / 2.0)
                .set("width", ACTIVATION_WIDTH)
                .set("height", self.height)
                .set("fill", fill),
            &self.stroke
        );
        output.add_to_layer(RenderLayer::Activation, Box::new(rect));
        output
    }

    fn size(&self) -> Size {
        Size::new(ACTIVATION_WIDTH + self.offset() * 2.0, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_shifts_right() {
        let outer = ActivationBox::new(40.0, 0, StrokeDefinition::default());
        let inner = ActivationBox::new(20.0, 2, StrokeDefinition::default());
        assert_eq!(outer.offset(), 0.0);
        assert_eq!(inner.offset(), 8.0);

        let svg: String = inner
            .render_to_layers(Point::new(100.0, 50.0))
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect();
        assert!(svg.contains("x=\"103\""));
        assert!(svg.contains("data-layer=\"activation\""));
    }
}
