//! Color handling for Tracery diagrams
//!
//! This module provides the [`Color`] type which wraps the `DynamicColor` type
//! from the color crate. Diagram sources write colors in the `#name` or
//! `#RRGGBB` form; [`Color::from_sharp`] accepts both.

use std::{
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::DynamicColor;

/// Wrapper around the `DynamicColor` type from the color crate.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Color {
    /// Create a new `Color` from a CSS color string such as "#ff0000",
    /// "rgb(255, 0, 0)" or "red".
    ///
    /// # Examples
    ///
    /// ```
    /// use tracery_core::color::Color;
    ///
    /// let red = Color::new("#ff0000").unwrap();
    /// let blue = Color::new("blue").unwrap();
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self { color }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Create a `Color` from the `#` form used in diagram sources.
    ///
    /// `#FF0000` and `#abc` are read as hexadecimal RGB values, anything
    /// else after the `#` as a CSS color name (case insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use tracery_core::color::Color;
    ///
    /// assert_eq!(Color::from_sharp("#red").unwrap(), Color::new("red").unwrap());
    /// assert_eq!(Color::from_sharp("#FF0000").unwrap(), Color::new("#ff0000").unwrap());
    /// assert!(Color::from_sharp("#notacolor").is_err());
    /// ```
    pub fn from_sharp(value: &str) -> Result<Self, String> {
        let body = value.strip_prefix('#').unwrap_or(value);
        let is_hex = matches!(body.len(), 3 | 6 | 8) && body.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex {
            Self::new(&format!("#{}", body.to_ascii_lowercase()))
        } else {
            Self::new(&body.to_ascii_lowercase())
        }
    }

    /// Returns a sanitized, ID-safe string representation of this color.
    ///
    /// Used to derive SVG marker ids for colored arrow heads. The result
    /// contains only alphanumeric characters and underscores.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracery_core::color::Color;
    ///
    /// let color = Color::new("#ff8000").unwrap();
    /// let id_str = color.to_id_safe_string();
    /// assert!(id_str.chars().all(|c| c.is_alphanumeric() || c == '_'));
    /// ```
    pub fn to_id_safe_string(self) -> String {
        let mut sanitized: String = self
            .to_string()
            .replace('#', "hex")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            sanitized = format!("c_{sanitized}");
        }

        sanitized
    }

    /// Returns the alpha (transparency) component of this color.
    pub fn alpha(&self) -> f32 {
        self.color.components[3]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.color)
    }
}

impl From<&Color> for svg::node::Value {
    fn from(color: &Color) -> Self {
        Self::from(color.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_new() {
        assert!(Color::new("#ff0000").is_ok());
        assert!(Color::new("not-a-color").is_err());
    }

    #[test]
    fn test_from_sharp_name() {
        let color = Color::from_sharp("#LightBlue").unwrap();
        assert_eq!(color, Color::new("lightblue").unwrap());
    }

    #[test]
    fn test_from_sharp_hex() {
        assert_eq!(
            Color::from_sharp("#00FF00").unwrap(),
            Color::new("#00ff00").unwrap()
        );
        assert!(Color::from_sharp("#0f0").is_ok());
    }

    #[test]
    fn test_from_sharp_without_prefix() {
        assert_eq!(Color::from_sharp("red").unwrap(), Color::new("red").unwrap());
    }

    #[test]
    fn test_color_default() {
        let color = Color::default();
        assert_eq!(color.to_string(), "black");
    }

    #[test]
    fn test_color_to_id_safe_string() {
        let safe_id = Color::new("#ff0000").unwrap().to_id_safe_string();
        assert!(safe_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert!(!safe_id.starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn test_color_eq_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Color::new("red").unwrap());
        assert!(set.contains(&Color::from_sharp("#red").unwrap()));
        assert!(!set.contains(&Color::new("blue").unwrap()));
    }
}
