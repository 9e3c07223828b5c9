//! Drawables used by the diagram layouts.
//!
//! Every type here owns its data so a finished [`Layout`](crate::layout::Layout)
//! does not borrow from the diagram model.

mod activation_box;
mod arrow;
mod lifeline;
mod note;
mod shape;

pub use activation_box::{ACTIVATION_WIDTH, ActivationBox};
pub use arrow::{Arrow, ArrowHead};
pub use lifeline::Lifeline;
pub use note::Note;
pub use shape::{Shape, ShapeKind};

use tracery_core::{
    draw::{Drawable, LayeredOutput, Text, TextAnchor, TextStyle},
    geometry::{Point, Size},
};

/// An owned block of text.
#[derive(Debug, Clone)]
pub struct TextBlock {
    style: TextStyle,
    lines: Vec<String>,
}

impl TextBlock {
    pub fn new(style: TextStyle, lines: impl IntoIterator<Item = String>) -> Self {
        Self {
            style,
            lines: lines.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Drawable for TextBlock {
    /// `position` is the center of the block; the anchor only aligns the
    /// lines inside it.
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let text = Text::from_lines(&self.style, &self.lines);
        let half_width = text.calculate_size().width() / 2.0;
        let x = match self.style.anchor() {
            TextAnchor::Start => position.x() - half_width,
            TextAnchor::Middle => position.x(),
            TextAnchor::End => position.x() + half_width,
        };
        text.render_to_layers(position.with_x(x))
    }

    fn size(&self) -> Size {
        Text::from_lines(&self.style, &self.lines).calculate_size()
    }
}
