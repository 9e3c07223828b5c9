//! Diagnostics reported while splitting, preprocessing and parsing sources.
//!
//! Every problem is a [`Diagnostic`] with a [`Severity`], an optional
//! [`ErrorCode`], labeled byte spans into the original source text and
//! optional help text. [`ParseError`] wraps all error diagnostics found in
//! one parse.
//!
//! ```
//! # use tracery_parser::{Span, error::{Diagnostic, ErrorCode}};
//! let diag = Diagnostic::error("Nowhere to return to.")
//!     .with_code(ErrorCode::E201)
//!     .with_label(Span::new(42..48), "no active message here")
//!     .with_help("add a message before `return`");
//! assert_eq!(diag.to_string(), "error[E201]: Nowhere to return to.");
//! ```

mod diagnostic;
mod error_code;
mod parse_error;

pub(crate) use parse_error::DiagnosticCollector;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use parse_error::ParseError;
