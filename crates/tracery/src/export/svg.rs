//! SVG export of laid out diagrams.
//!
//! The document is sized to the content bounds plus a margin on every
//! side. Content is shifted into view with a single translated group, so
//! layout engines are free to use negative coordinates.

use log::debug;
use svg::{Document, node::element as svg_element};

use tracery_core::{color::Color, geometry::Size};

use super::Error;
use crate::layout::{Layout, Theme};

const DEFAULT_MARGIN: f32 = 20.0;

/// Builder for [`Svg`].
#[derive(Debug, Clone)]
pub struct SvgBuilder {
    background: Option<Color>,
    margin: f32,
}

impl SvgBuilder {
    pub fn new() -> Self {
        Self {
            background: None,
            margin: DEFAULT_MARGIN,
        }
    }

    /// Takes the background color from `theme`.
    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.background = theme.background();
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    pub fn build(self) -> Svg {
        Svg {
            background: self.background,
            margin: self.margin,
        }
    }
}

impl Default for SvgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a [`Layout`] to an SVG document string.
#[derive(Debug, Clone)]
pub struct Svg {
    background: Option<Color>,
    margin: f32,
}

impl Svg {
    /// Content size plus the margin on both sides.
    fn document_size(&self, content: Size) -> Size {
        Size::new(
            self.margin.mul_add(2.0, content.width()),
            self.margin.mul_add(2.0, content.height()),
        )
    }

    fn add_background(&self, doc: Document, size: Size) -> Document {
        let Some(color) = &self.background else {
            return doc;
        };
        let background = svg_element::Rectangle::new()
            .set("x", 0)
            .set("y", 0)
            .set("width", size.width())
            .set("height", size.height())
            .set("fill", color);
        doc.add(background)
    }

    /// # Errors
    ///
    /// Returns [`Error::Render`] when the layout has non-finite bounds.
    pub fn render(&self, layout: &Layout) -> Result<String, Error> {
        let bounds = layout.bounds();
        if !(bounds.width().is_finite() && bounds.height().is_finite()) {
            return Err(Error::Render(
                "layout produced non-finite coordinates".to_string(),
            ));
        }
        let size = self.document_size(bounds.to_size());

        let doc = Document::new()
            .set("viewBox", format!("0 0 {} {}", size.width(), size.height()))
            .set("width", size.width())
            .set("height", size.height());
        let doc = self.add_background(doc, size);

        let mut main_group = svg_element::Group::new().set(
            "transform",
            format!(
                "translate({}, {})",
                self.margin - bounds.min_x(),
                self.margin - bounds.min_y()
            ),
        );
        for node in layout.render().render() {
            main_group = main_group.add(node);
        }

        debug!(width = size.width(), height = size.height(); "SVG document rendered");
        Ok(doc.add(main_group).to_string())
    }
}

#[cfg(test)]
mod tests {
    use tracery_core::{draw::TextStyle, geometry::Point, model::DiagramMeta};

    use super::*;
    use crate::{config::StyleConfig, draw::TextBlock};

    fn layout() -> Layout {
        let mut layout = Layout::new();
        layout.push(
            TextBlock::new(TextStyle::default(), ["hello".to_string()]),
            Point::new(-50.0, 10.0),
        );
        layout
    }

    #[test]
    fn test_document_wraps_content() {
        let svg = SvgBuilder::new().build().render(&layout()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("hello"));
        assert!(svg.contains("translate("));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn test_background_from_theme() {
        let style = StyleConfig::new(Some("#102030".to_string()), None, None);
        let theme = Theme::new(&style, &DiagramMeta::default()).unwrap();
        let svg = SvgBuilder::new()
            .with_theme(&theme)
            .build()
            .render(&layout())
            .unwrap();
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_margin_sets_size() {
        let layout = layout();
        let content = layout.bounds();
        let svg = SvgBuilder::new().with_margin(0.0).build().render(&layout).unwrap();
        assert!(svg.contains(&format!("viewBox=\"0 0 {} {}\"", content.width(), content.height())));
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let svg = SvgBuilder::new().build();
        assert_eq!(svg.render(&layout()).unwrap(), svg.render(&layout()).unwrap());
    }
}
