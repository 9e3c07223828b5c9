//! Layout engines for positioning diagram elements.
//!
//! This module transforms parsed diagrams into positioned drawables ready
//! for rendering. Every diagram family has its own engine; all of them
//! produce a [`Layout`] in absolute coordinates, which the SVG exporter
//! frames and writes out.
//!
//! # Pipeline Position
//!
//! ```text
//! Diagram (model)
//!     ↓ layout (this module)
//! Layout
//!     ↓ frame (title, header, footer, caption)
//!     ↓ export
//! Output
//! ```
//!
//! # Submodules
//!
//! - [`sequence`] - Columns of participants and rows of events
//! - [`timing`] - One row per player along a shared time axis
//! - [`railroad`] - Railroad tracks for EBNF rules
//! - [`entity`] - Layered placement of class and component diagrams
//! - [`frame`] - Title, header, footer and caption around the content

pub mod entity;
pub mod frame;
pub mod railroad;
pub mod sequence;
pub mod timing;

use log::{debug, warn};

use tracery_core::{
    color::Color,
    draw::{Drawable, LayeredOutput, PositionedDrawable, StrokeDefinition, TextStyle},
    geometry::{Bounds, Point},
    model::{Diagram, DiagramMeta},
};

use crate::{TraceryError, config::StyleConfig, draw::Arrow};

/// Positioned drawables in absolute coordinates.
#[derive(Debug, Default)]
pub struct Layout {
    items: Vec<PositionedDrawable<Box<dyn Drawable>>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `drawable` centered at `position`.
    pub fn push(&mut self, drawable: impl Drawable + 'static, position: Point) {
        let boxed: Box<dyn Drawable> = Box::new(drawable);
        self.items
            .push(PositionedDrawable::new(boxed).with_position(position));
    }

    /// Adds an arrow at the coordinates it was built with.
    pub fn push_arrow(&mut self, arrow: Arrow) {
        let center = arrow.center();
        self.push(arrow, center);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Smallest bounds containing every item.
    pub fn bounds(&self) -> Bounds {
        let mut items = self.items.iter();
        let Some(first) = items.next() else {
            return Bounds::default();
        };
        items.fold(first.bounds(), |bounds, item| bounds.merge(&item.bounds()))
    }

    pub fn render(&self) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        for item in &self.items {
            output.merge(item.render_to_layers());
        }
        output
    }
}

/// Resolved visual settings for one diagram.
///
/// Built from the [`StyleConfig`] and overridden by the diagram's own
/// skin parameters.
#[derive(Debug, Clone)]
pub struct Theme {
    text: TextStyle,
    background: Option<Color>,
    line_color: Color,
    note_fill: Option<Color>,
    fill: Option<Color>,
}

impl Theme {
    /// # Errors
    ///
    /// Fails when the configured background color is invalid. Invalid
    /// skin parameter colors are logged and ignored.
    pub fn new(style: &StyleConfig, meta: &DiagramMeta) -> Result<Self, TraceryError> {
        let font_family = meta
            .skin_param("defaultFontName")
            .unwrap_or(style.font_family());
        let font_size = meta
            .skin_param("defaultFontSize")
            .and_then(|size| size.parse::<f32>().ok())
            .filter(|size| *size > 0.0)
            .unwrap_or(style.font_size());
        let font_color = skin_color(meta, "defaultFontColor");

        let background = match skin_color(meta, "backgroundColor") {
            Some(color) => Some(color),
            None => style.background_color().map_err(TraceryError::Layout)?,
        };

        let theme = Self {
            text: TextStyle::new(font_family, font_size).with_color(font_color),
            background,
            line_color: skin_color(meta, "arrowColor").unwrap_or_default(),
            note_fill: skin_color(meta, "noteBackgroundColor"),
            fill: skin_color(meta, "defaultBackgroundColor"),
        };
        debug!(font_family, font_size; "Theme resolved");
        Ok(theme)
    }

    pub fn text(&self) -> TextStyle {
        self.text.clone()
    }

    pub fn small_text(&self) -> TextStyle {
        let size = self.text.font_size() * 0.85;
        self.text.clone().with_font_size(size)
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    pub fn line(&self) -> StrokeDefinition {
        StrokeDefinition::solid(self.line_color, 1.0)
    }

    pub fn dashed_line(&self) -> StrokeDefinition {
        StrokeDefinition::dashed(self.line_color, 1.0)
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill
    }

    pub fn note_fill(&self) -> Option<Color> {
        self.note_fill
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: TextStyle::default(),
            background: None,
            line_color: Color::default(),
            note_fill: None,
            fill: None,
        }
    }
}

fn skin_color(meta: &DiagramMeta, key: &str) -> Option<Color> {
    let value = meta.skin_param(key)?;
    let parsed = if value.starts_with('#') {
        Color::from_sharp(value)
    } else {
        Color::new(value)
    };
    match parsed {
        Ok(color) => Some(color),
        Err(err) => {
            warn!(key, value; "Ignoring skin parameter: {err}");
            None
        }
    }
}

/// Lays out any diagram, including its title, header, footer and caption.
///
/// # Errors
///
/// Returns [`TraceryError::Layout`] when the diagram refers to elements it
/// does not contain.
pub fn layout_diagram(diagram: &Diagram, theme: &Theme) -> Result<Layout, TraceryError> {
    let mut layout = match diagram {
        Diagram::Sequence(diagram) => sequence::layout(diagram, theme)?,
        Diagram::Timing(diagram) => timing::layout(diagram, theme),
        Diagram::Ebnf(diagram) => railroad::layout(diagram, theme),
        Diagram::Entity(diagram) => entity::layout(diagram, theme)?,
    };
    debug!(kind:% = diagram.kind(), items = layout.len(); "Content laid out");
    frame::add_frame(&mut layout, diagram.meta(), theme);
    Ok(layout)
}
