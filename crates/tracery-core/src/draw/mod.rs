//! Rendering primitives shared by every diagram renderer.
//!
//! Components implement [`Drawable`]: they know their own [`Size`] and can
//! render themselves at a position into a [`LayeredOutput`], which keeps
//! the z-order of the final SVG stable.

mod layer;
mod positioned;
mod stroke;
mod text;

pub use layer::{LayeredOutput, RenderLayer, SvgNode};
pub use positioned::PositionedDrawable;
pub use stroke::{StrokeDefinition, StrokeStyle};
pub use text::{Text, TextAnchor, TextStyle};

use crate::geometry::{Point, Size};

/// A component that can be measured and rendered to SVG.
pub trait Drawable: std::fmt::Debug {
    /// Renders the component with its center at `position`.
    fn render_to_layers(&self, position: Point) -> LayeredOutput;

    fn size(&self) -> Size;
}
