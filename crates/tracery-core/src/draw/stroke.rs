//! Stroke definitions and the [`apply_stroke!`](crate::apply_stroke!) macro.
//!
//! ```
//! use tracery_core::{apply_stroke, color::Color, draw::StrokeDefinition};
//! use svg::node::element::Line;
//!
//! let stroke = StrokeDefinition::dotted(Color::new("black").unwrap(), 1.0);
//! let line = apply_stroke!(Line::new(), &stroke);
//! assert!(line.to_string().contains("stroke-dasharray"));
//! ```

use std::str::FromStr;

use crate::color::Color;

/// Line pattern, mapped to `stroke-dasharray`.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Custom(String),
}

impl FromStr for StrokeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solid" => Ok(Self::Solid),
            "dashed" => Ok(Self::Dashed),
            "dotted" => Ok(Self::Dotted),
            _ if s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ') => {
                Ok(Self::Custom(s.to_string()))
            }
            _ => Err(format!(
                "invalid stroke style `{s}`, valid values: solid, dashed, dotted or a dash pattern"
            )),
        }
    }
}

impl StrokeStyle {
    /// The `stroke-dasharray` value, `None` for solid lines.
    pub fn to_svg_value(&self) -> Option<String> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some("5,5".to_string()),
            Self::Dotted => Some("2,3".to_string()),
            Self::Custom(pattern) => Some(pattern.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeDefinition {
    color: Color,
    width: f32,
    style: StrokeStyle,
}

impl Default for StrokeDefinition {
    fn default() -> Self {
        Self::new(Color::default(), 1.0)
    }
}

impl StrokeDefinition {
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            style: StrokeStyle::Solid,
        }
    }

    pub fn solid(color: Color, width: f32) -> Self {
        Self::new(color, width)
    }

    pub fn dashed(color: Color, width: f32) -> Self {
        Self::new(color, width).with_style(StrokeStyle::Dashed)
    }

    pub fn dotted(color: Color, width: f32) -> Self {
        Self::new(color, width).with_style(StrokeStyle::Dotted)
    }

    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }
}

/// Sets `stroke`, `stroke-opacity`, `stroke-width` and, for patterned
/// strokes, `stroke-dasharray` on an SVG element.
#[macro_export]
macro_rules! apply_stroke {
    ($element:expr, $stroke:expr) => {{
        let mut elem = $element
            .set("stroke", $stroke.color().to_string())
            .set("stroke-width", $stroke.width());

        if $stroke.color().alpha() < 1.0 {
            elem = elem.set("stroke-opacity", $stroke.color().alpha());
        }
        if let Some(dasharray) = $stroke.style().to_svg_value() {
            elem = elem.set("stroke-dasharray", dasharray);
        }

        elem
    }};
}

#[cfg(test)]
mod tests {
    use svg::node::element as svg_element;

    use super::*;

    #[test]
    fn test_default_stroke() {
        let stroke = StrokeDefinition::default();
        assert_eq!(stroke.width(), 1.0);
        assert_eq!(stroke.color().to_string(), "black");
        assert_eq!(*stroke.style(), StrokeStyle::Solid);
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("Dotted".parse::<StrokeStyle>(), Ok(StrokeStyle::Dotted));
        assert_eq!(
            "4,2".parse::<StrokeStyle>(),
            Ok(StrokeStyle::Custom("4,2".to_string()))
        );
        assert!("wavy".parse::<StrokeStyle>().is_err());
    }

    #[test]
    fn test_apply_solid_stroke_has_no_dasharray() {
        let stroke = StrokeDefinition::solid(Color::new("red").unwrap(), 2.0);
        let rendered = apply_stroke!(svg_element::Line::new(), &stroke).to_string();
        assert!(rendered.contains("stroke=\"red\""));
        assert!(rendered.contains("stroke-width=\"2\""));
        assert!(!rendered.contains("stroke-dasharray"));
        assert!(!rendered.contains("stroke-opacity"));
    }
}
