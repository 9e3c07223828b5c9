//! Turns a source file into output files, one per diagram block.
//!
//! The first block is written to `<stem>.<ext>`, later blocks to
//! `<stem>_001.<ext>`, `<stem>_002.<ext>` and so on. A block named with
//! `@startuml name` is written to `<name>.<ext>` instead.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    DiagramBuilder, GraphmlContext, ParsedDiagram, TraceryError, config::FileFormat, metadata,
};

/// One output file produced by [`SourceFileReader::generated_images`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    path: PathBuf,
    description: String,
    reused: bool,
}

impl GeneratedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short summary of the diagram, e.g. `(2 participants)`.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// `true` when an up to date output already existed and was left
    /// untouched.
    pub fn reused(&self) -> bool {
        self.reused
    }
}

/// Reads one source file and writes its diagrams to an output directory.
pub struct SourceFileReader {
    path: PathBuf,
    output_dir: PathBuf,
    format: FileFormat,
    check_metadata: bool,
    builder: DiagramBuilder,
}

impl SourceFileReader {
    pub fn new(path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            output_dir: output_dir.into(),
            format,
            check_metadata: false,
            builder: DiagramBuilder::default(),
        }
    }

    /// Keep SVG outputs whose embedded signature matches their block.
    ///
    /// Has no effect on GraphML, which carries no signature.
    pub fn with_check_metadata(mut self, check_metadata: bool) -> Self {
        self.check_metadata = check_metadata;
        self
    }

    /// Render with `builder` instead of a default one.
    pub fn with_builder(mut self, builder: DiagramBuilder) -> Self {
        self.builder = builder;
        self
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map_or_else(|| "diagram".to_string(), |stem| stem.to_string_lossy().into_owned())
    }

    /// Output path of the block at `index`, named `name` if given.
    ///
    /// The path always stays inside the output directory.
    fn output_path(&self, index: usize, name: Option<&str>) -> PathBuf {
        let name = name.and_then(block_file_name);
        let file_name = match name.as_deref() {
            Some(name) => format!("{name}.{}", self.format.extension()),
            None if index == 0 => format!("{}.{}", self.stem(), self.format.extension()),
            None => format!("{}_{index:03}.{}", self.stem(), self.format.extension()),
        };
        self.output_dir.join(file_name)
    }

    /// `true` when `path` holds an SVG signed with the signature of `parsed`.
    fn is_up_to_date(&self, path: &Path, parsed: &ParsedDiagram) -> bool {
        if !self.check_metadata || self.format != FileFormat::Svg {
            return false;
        }
        let Ok(existing) = fs::read_to_string(path) else {
            return false;
        };
        metadata::extract_signature(&existing)
            .is_some_and(|signature| signature == metadata::signature(parsed.block().text()))
    }

    fn render(&self, parsed: &ParsedDiagram) -> Result<String, TraceryError> {
        match self.format {
            FileFormat::Svg => self.builder.render_svg(parsed),
            FileFormat::Graphml => {
                let context = GraphmlContext::new(
                    self.path.to_string_lossy().into_owned(),
                    parsed.block().index(),
                );
                self.builder.export_graphml(parsed.diagram(), &context)
            }
        }
    }

    /// Parses the source file and writes one output per block.
    ///
    /// # Errors
    ///
    /// Returns [`TraceryError::Io`] when the source cannot be read or an
    /// output cannot be written, and the parse, layout or export error of
    /// the first block that fails.
    pub fn generated_images(&self) -> Result<Vec<GeneratedImage>, TraceryError> {
        info!(path:? = self.path, format:% = self.format; "Reading source file");
        let source = fs::read_to_string(&self.path)?;
        let diagrams = self.builder.parse(&source)?;

        if !diagrams.is_empty() {
            fs::create_dir_all(&self.output_dir)?;
        }

        let mut images = Vec::with_capacity(diagrams.len());
        for parsed in &diagrams {
            let block = parsed.block();
            let path = self.output_path(block.index(), block.name());
            let description = parsed.diagram().description();

            if self.is_up_to_date(&path, parsed) {
                debug!(path:?; "Output is up to date");
                images.push(GeneratedImage {
                    path,
                    description,
                    reused: true,
                });
                continue;
            }

            let document = self.render(parsed)?;
            fs::write(&path, document)?;
            info!(path:?, description:%; "Output written");
            images.push(GeneratedImage {
                path,
                description,
                reused: false,
            });
        }
        Ok(images)
    }
}

/// A block name usable as a file name: path separators become `_`.
///
/// Names made of dots only are unusable.
fn block_file_name(name: &str) -> Option<String> {
    let name: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if name.chars().all(|c| c == '.') {
        return None;
    }
    Some(name)
}
