//! Tracery Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Tracery
//! preprocessor, command grammars and renderers. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Colors**: Color handling with CSS and `#name` support ([`color::Color`])
//! - **Labels**: Multi-line display text ([`label::Label`])
//! - **Geometry**: Basic geometric types ([`geometry`] module)
//! - **Model**: The in-memory diagram aggregates ([`model`] module)
//! - **Draw**: Rendering primitives for SVG output ([`draw`] module)

pub mod color;
pub mod draw;
pub mod geometry;
pub mod identifier;
pub mod label;
pub mod model;
