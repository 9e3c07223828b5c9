//! Provides [`PositionedDrawable`], a drawable together with its absolute
//! position.

use crate::{
    draw::{Drawable, LayeredOutput},
    geometry::{Bounds, Point, Size},
};

/// A drawable object together with an absolute position.
///
/// The position is the center of the drawable, matching
/// [`Drawable::render_to_layers`].
#[derive(Debug)]
pub struct PositionedDrawable<D: Drawable> {
    drawable: D,
    position: Point,
}

impl<D: Drawable> PositionedDrawable<D> {
    /// Wraps a drawable placed at the origin.
    pub fn new(drawable: D) -> Self {
        Self {
            drawable,
            position: Point::default(),
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn render_to_layers(&self) -> LayeredOutput {
        self.drawable.render_to_layers(self.position)
    }

    pub fn bounds(&self) -> Bounds {
        self.position.to_bounds(self.drawable.size())
    }

    pub fn inner(&self) -> &D {
        &self.drawable
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

impl<D: Drawable + ?Sized> Drawable for Box<D> {
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        (**self).render_to_layers(position)
    }

    fn size(&self) -> Size {
        (**self).size()
    }
}
