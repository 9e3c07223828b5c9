//! Export functionality for Tracery diagrams.
//!
//! This is the final stage of the processing pipeline. Both backends
//! produce the whole document as a `String`; writing files is left to the
//! caller.
//!
//! # Pipeline Position
//!
//! ```text
//! Source Text
//!     ↓ parse
//! Diagram Model
//!     ↓ layout
//! Positioned Drawables (Layout)
//!     ↓ export (this module)
//! Output Document
//! ```
//!
//! # Available Backends
//!
//! - [`svg`] - SVG documents via [`svg::SvgBuilder`] and [`svg::Svg`]
//! - [`graphml`] - GraphML documents of the diagram model; no layout needed
//!
//! # Error Handling
//!
//! Export operations return [`Error`], which converts into
//! [`TraceryError::Export`] at the crate boundary.
//!
//! [`TraceryError::Export`]: crate::TraceryError::Export

pub mod graphml;
pub mod svg;

/// Errors that can occur during diagram export.
#[derive(Debug)]
pub enum Error {
    /// A rendering or conversion failure described by `message`.
    Render(String),
    /// Formatting the document text failed.
    Format(std::fmt::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(msg) => write!(f, "Render error: {msg}"),
            Self::Format(err) => write!(f, "Format error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(_) => None,
            Self::Format(err) => Some(err),
        }
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::Format(err)
    }
}
