//! Text styles and measurement.
//!
//! Measurement never touches the fonts installed on the host: widths come
//! from a fixed per-character advance table scaled by the font size. The
//! same source therefore lays out identically on every machine, which keeps
//! the SVG output byte-stable.
//!
//! ```
//! # use tracery_core::draw::{Text, TextStyle};
//! let style = TextStyle::default();
//! let text = Text::new(&style, "Hello\nDiagram");
//! let size = text.calculate_size();
//! assert!(size.width() > 0.0);
//! assert_eq!(size.height(), 2.0 * style.line_height());
//! ```

use svg::node::{Text as SvgText, element as svg_element};

use crate::{
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer},
    geometry::{Insets, Point, Size},
};

const LINE_HEIGHT_FACTOR: f32 = 1.25;

/// Advance width of a character in em units.
fn advance(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' | '-' => 0.36,
        ' ' => 0.3,
        '\t' => 1.2,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.86,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.56,
        c if c.is_ascii() => 0.52,
        // CJK and other wide scripts
        c if (c as u32) >= 0x1100 => 1.0,
        _ => 0.6,
    }
}

/// Horizontal alignment of a text block relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    Start,
    #[default]
    Middle,
    End,
}

impl TextAnchor {
    fn to_svg_value(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    font_family: String,
    font_size: f32,
    color: Option<Color>,
    bold: bool,
    italic: bool,
    anchor: TextAnchor,
    padding: Insets,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: String::from("sans-serif"),
            font_size: 13.0,
            color: None,
            bold: false,
            italic: false,
            anchor: TextAnchor::Middle,
            padding: Insets::default(),
        }
    }
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_size: f32) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
            ..Self::default()
        }
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    pub fn anchor(&self) -> TextAnchor {
        self.anchor
    }

    /// Width of a single line of text.
    pub fn measure_line(&self, line: &str) -> f32 {
        let factor = if self.bold { 1.08 } else { 1.0 };
        line.chars().map(advance).sum::<f32>() * self.font_size * factor
    }

    /// Size of a block of lines without padding.
    pub fn measure<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Size {
        let (width, count) = lines
            .into_iter()
            .fold((0.0f32, 0usize), |(width, count), line| {
                (width.max(self.measure_line(line)), count + 1)
            });
        Size::new(width, count as f32 * self.line_height())
    }
}

/// A block of text rendered as one `<text>` element with a `<tspan>` per line.
#[derive(Debug, Clone)]
pub struct Text<'a> {
    style: &'a TextStyle,
    lines: Vec<&'a str>,
}

impl<'a> Text<'a> {
    /// Creates a text block, splitting `content` on newlines.
    pub fn new(style: &'a TextStyle, content: &'a str) -> Self {
        let lines = if content.is_empty() {
            Vec::new()
        } else {
            content.split('\n').collect()
        };
        Self { style, lines }
    }

    pub fn from_lines(style: &'a TextStyle, lines: &'a [String]) -> Self {
        Self {
            style,
            lines: lines.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Size including padding.
    pub fn calculate_size(&self) -> Size {
        if self.lines.is_empty() {
            return Size::default();
        }
        self.style
            .measure(self.lines.iter().copied())
            .add_padding(self.style.padding)
    }
}

impl Drawable for Text<'_> {
    /// `position` is the vertical center of the block; horizontally it is
    /// the left edge, center or right edge depending on the anchor.
    fn render_to_layers(&self, position: Point) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        if self.lines.is_empty() {
            return output;
        }

        let line_height = self.style.line_height();
        let padding = self.style.padding;
        let total_height = line_height * self.lines.len() as f32;
        let x = match self.style.anchor {
            TextAnchor::Start => position.x() + padding.left(),
            TextAnchor::Middle => position.x(),
            TextAnchor::End => position.x() - padding.right(),
        };
        // Baseline of the first line sits at 80% of its line box.
        let first_baseline = position.y() - total_height / 2.0 + line_height * 0.8;

        let mut text = svg_element::Text::new("")
            .set("x", x)
            .set("y", first_baseline)
            .set("text-anchor", self.style.anchor.to_svg_value())
            .set("font-family", self.style.font_family.as_str())
            .set("font-size", self.style.font_size);
        if let Some(color) = &self.style.color {
            text = text.set("fill", color);
        }
        if self.style.bold {
            text = text.set("font-weight", "bold");
        }
        if self.style.italic {
            text = text.set("font-style", "italic");
        }

        for (index, line) in self.lines.iter().enumerate() {
            let dy = if index == 0 { 0.0 } else { line_height };
            let tspan = svg_element::TSpan::new("")
                .set("x", x)
                .set("dy", dy)
                .add(SvgText::new(*line));
            text = text.add(tspan);
        }

        output.add_to_layer(RenderLayer::Text, Box::new(text));
        output
    }

    fn size(&self) -> Size {
        self.calculate_size()
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_empty_text_has_zero_size() {
        let style = TextStyle::default();
        let text = Text::new(&style, "");
        assert!(text.is_empty());
        assert_eq!(text.calculate_size(), Size::default());
        assert!(text.render_to_layers(Point::default()).is_empty());
    }

    #[test]
    fn test_wide_characters_are_wider() {
        let style = TextStyle::default();
        assert!(style.measure_line("WWW") > style.measure_line("iii"));
    }

    #[test]
    fn test_padding_is_added() {
        let style = TextStyle::default().with_padding(Insets::uniform(5.0));
        let size = Text::new(&style, "abc").calculate_size();
        assert_approx_eq!(f32, size.width(), style.measure_line("abc") + 10.0);
        assert_approx_eq!(f32, size.height(), style.line_height() + 10.0);
    }

    #[test]
    fn test_render_emits_one_tspan_per_line() {
        let style = TextStyle::default().with_bold(true);
        let text = Text::new(&style, "one\ntwo");
        let rendered: String = text
            .render_to_layers(Point::new(50.0, 50.0))
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect();
        assert_eq!(rendered.matches("<tspan").count(), 2);
        assert!(rendered.contains("font-weight=\"bold\""));
    }

    proptest! {
        #[test]
        fn width_scales_with_font_size(text in "[a-zA-Z0-9 ]{1,20}", size in 8.0f32..40.0) {
            let small = TextStyle::default().with_font_size(size);
            let large = TextStyle::default().with_font_size(size * 2.0);
            let ratio = large.measure_line(&text) / small.measure_line(&text);
            prop_assert!((ratio - 2.0).abs() < 1e-3);
        }
    }
}
