//! Tracery - A text-to-diagram generator.
//!
//! Layout and rendering for sequence, timing, EBNF, class and component
//! diagrams written in a line-oriented text language. Parsing lives in
//! `tracery-parser`; this crate turns the parsed model into SVG or
//! GraphML and manages output files.

pub mod config;
pub mod metadata;
pub mod reader;

mod draw;
mod error;
mod export;
mod layout;
mod structure;

pub use tracery_core::{color, identifier, label, model};
pub use tracery_parser::ParsedDiagram;

pub use error::TraceryError;
pub use export::graphml::GraphmlContext;
pub use reader::{GeneratedImage, SourceFileReader};

use log::{debug, info, trace};

use tracery_core::model::Diagram;
use tracery_parser::DiagramParser;

use config::AppConfig;
use export::{graphml::Graphml, svg::SvgBuilder};
use layout::Theme;

/// Builder for parsing and rendering Tracery diagrams.
///
/// This provides an API for processing diagram sources through parsing,
/// layout, and rendering stages.
///
/// # Examples
///
/// ```rust,no_run
/// use tracery::{DiagramBuilder, config::AppConfig};
///
/// let source = "@startuml\nAlice -> Bob : hello\n@enduml";
///
/// // With custom config
/// let config = AppConfig::default();
/// let builder = DiagramBuilder::new(config);
///
/// // One parsed diagram per @start/@end block
/// let diagrams = builder.parse(source)
///     .expect("Failed to parse");
///
/// // Render a diagram to SVG
/// let svg = builder.render_svg(&diagrams[0])
///     .expect("Failed to render");
///
/// // Or use default config
/// let builder = DiagramBuilder::default();
/// ```
pub struct DiagramBuilder {
    config: AppConfig,
    parser: DiagramParser,
}

impl DiagramBuilder {
    /// Create a new diagram builder with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration including style and output settings
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            parser: DiagramParser::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse source text into one diagram per block.
    ///
    /// This runs block splitting, preprocessing and the command grammars
    /// of every diagram family.
    ///
    /// # Errors
    ///
    /// Returns [`TraceryError::Parse`] holding every error diagnostic of the
    /// source.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tracery::{DiagramBuilder, config::AppConfig};
    ///
    /// let source = "@startebnf\ndigit = \"0\" | \"1\" ;\n@endebnf";
    /// let builder = DiagramBuilder::new(AppConfig::default());
    /// let diagrams = builder.parse(source)
    ///     .expect("Failed to parse diagram");
    /// assert_eq!(diagrams.len(), 1);
    /// ```
    pub fn parse(&self, source: &str) -> Result<Vec<ParsedDiagram>, TraceryError> {
        info!("Parsing diagram source");

        let diagrams = self
            .parser
            .parse(source)
            .map_err(|err| TraceryError::new_parse_error(err, source))?;

        debug!(blocks = diagrams.len(); "Source parsed successfully");
        trace!(diagrams:?; "Parsed diagrams");

        Ok(diagrams)
    }

    /// Render a parsed diagram to an SVG string.
    ///
    /// The document ends with the signature of the block it was read from,
    /// see [`metadata`].
    ///
    /// # Errors
    ///
    /// Returns `TraceryError` for invalid style settings, layout errors or
    /// rendering errors.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tracery::{DiagramBuilder, config::AppConfig};
    ///
    /// let source = "@startuml\nclass Car\n@enduml";
    /// let builder = DiagramBuilder::new(AppConfig::default());
    ///
    /// let diagrams = builder.parse(source)
    ///     .expect("Failed to parse");
    ///
    /// let svg = builder.render_svg(&diagrams[0])
    ///     .expect("Failed to render diagram");
    ///
    /// println!("{}", svg);
    /// ```
    pub fn render_svg(&self, parsed: &ParsedDiagram) -> Result<String, TraceryError> {
        let diagram = parsed.diagram();
        info!(diagram_kind:? = diagram.kind(); "Laying out diagram");

        let theme = Theme::new(self.config.style(), diagram.meta())?;
        let layout = layout::layout_diagram(diagram, &theme)?;
        info!(items = layout.len(); "Layout calculated");

        let svg = SvgBuilder::new().with_theme(&theme).build().render(&layout)?;
        let svg = metadata::embed(&svg, parsed.block().text());

        info!("SVG rendered successfully");
        Ok(svg)
    }

    /// Export the model of a diagram as GraphML.
    ///
    /// # Errors
    ///
    /// Returns [`TraceryError::Export`] when the document cannot be written.
    pub fn export_graphml(
        &self,
        diagram: &Diagram,
        context: &GraphmlContext,
    ) -> Result<String, TraceryError> {
        info!(diagram_kind:? = diagram.kind(), block = context.block_index(); "Exporting GraphML");
        let graphml = Graphml::new(context.clone()).export(diagram)?;
        Ok(graphml)
    }
}

impl Default for DiagramBuilder {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
