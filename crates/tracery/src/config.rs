//! Configuration types for Tracery diagram rendering.
//!
//! This module provides configuration structures that control how diagrams
//! are styled and written. All types implement [`serde::Deserialize`] for
//! flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level application configuration combining style and output settings.
//! - [`StyleConfig`] - Visual defaults such as background color and font.
//! - [`OutputConfig`] - Default [`FileFormat`] and metadata checking.
//!
//! Skin parameters written in a diagram (`skinparam backgroundColor ...`)
//! take precedence over the style configured here.
//!
//! # Example
//!
//! ```
//! # use tracery::config::{AppConfig, FileFormat};
//! // Use default configuration
//! let config = AppConfig::default();
//! assert!(config.style().background_color().is_ok());
//! assert_eq!(config.output().format(), FileFormat::Svg);
//! ```

use std::{fmt, str::FromStr};

use serde::Deserialize;

use tracery_core::color::Color;

const DEFAULT_FONT_FAMILY: &str = "sans-serif";
const DEFAULT_FONT_SIZE: f32 = 13.0;

/// Top-level application configuration combining style and output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Style configuration section.
    #[serde(default)]
    style: StyleConfig,

    /// Output configuration section.
    #[serde(default)]
    output: OutputConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified style and output configurations.
    pub fn new(style: StyleConfig, output: OutputConfig) -> Self {
        Self { style, output }
    }

    /// Returns the style configuration.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Returns the output configuration.
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }
}

/// Visual styling configuration for rendered diagrams.
///
/// Fields that are not set fall back to renderer defaults.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    /// Default background [`Color`] for diagrams, as a color string.
    #[serde(default)]
    background_color: Option<String>,

    #[serde(default)]
    font_family: Option<String>,

    #[serde(default)]
    font_size: Option<f32>,
}

impl StyleConfig {
    pub fn new(
        background_color: Option<String>,
        font_family: Option<String>,
        font_size: Option<f32>,
    ) -> Self {
        Self {
            background_color,
            font_family,
            font_size,
        }
    }

    /// Returns the parsed background [`Color`], or `None` if no color is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color string cannot be parsed
    /// into a valid [`Color`].
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }

    pub fn font_family(&self) -> &str {
        self.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY)
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
            .filter(|size| *size > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE)
    }
}

/// Output file formats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Svg,
    Graphml,
}

impl FileFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Graphml => "graphml",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "graphml" => Ok(Self::Graphml),
            _ => Err(format!("unknown format `{s}`, valid values: svg, graphml")),
        }
    }
}

/// Output configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OutputConfig {
    /// Format used when the command line does not choose one.
    #[serde(default)]
    format: FileFormat,

    /// Leave outputs whose embedded signature matches their source untouched.
    #[serde(default)]
    check_metadata: bool,
}

impl OutputConfig {
    pub fn new(format: FileFormat, check_metadata: bool) -> Self {
        Self {
            format,
            check_metadata,
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn check_metadata(&self) -> bool {
        self.check_metadata
    }
}
