//! CLI logic for the Tracery diagram tool.
//!
//! This module contains the core CLI logic: load the configuration, then
//! turn every input file into one output file per diagram block.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use tracery::{
    DiagramBuilder, GeneratedImage, SourceFileReader, TraceryError,
    config::{AppConfig, OutputConfig},
};

/// An error of [`run`], with the input that was being processed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
    input: Option<PathBuf>,
    #[source]
    error: TraceryError,
}

impl RunError {
    fn config(error: TraceryError) -> Self {
        Self { input: None, error }
    }

    fn input(input: &Path, error: TraceryError) -> Self {
        Self {
            input: Some(input.to_path_buf()),
            error,
        }
    }

    /// The input file that failed, `None` for configuration errors.
    pub fn path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn error(&self) -> &TraceryError {
        &self.error
    }

    /// Miette reports for this error, one per parse diagnostic.
    pub fn reports(&self) -> Vec<error_adapter::Report> {
        error_adapter::to_reports(&self.error, self.path())
    }
}

/// Command line flags take precedence over the `[output]` section.
fn effective_config(args: &Args, config: AppConfig) -> AppConfig {
    let output = OutputConfig::new(
        args.format.unwrap_or(config.output().format()),
        args.check_metadata || config.output().check_metadata(),
    );
    AppConfig::new(config.style().clone(), output)
}

/// Run the Tracery CLI application
///
/// Each input is read by a [`SourceFileReader`] writing into the output
/// directory, or next to the input when no directory is given. Processing
/// stops at the first input that fails.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns a [`RunError`] for configuration errors, and for I/O, parse,
/// layout or export errors of the first input that fails.
pub fn run(args: &Args) -> Result<Vec<GeneratedImage>, RunError> {
    let config = config::load_config(args.config.as_ref()).map_err(RunError::config)?;
    let config = effective_config(args, config);
    let format = config.output().format();
    let check_metadata = config.output().check_metadata();

    let mut images = Vec::new();
    for input in &args.inputs {
        let output_dir = match &args.output {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf),
        };
        info!(input:?, output_dir:?, format:%; "Processing diagram source");

        let reader = SourceFileReader::new(input, output_dir, format)
            .with_check_metadata(check_metadata)
            .with_builder(DiagramBuilder::new(config.clone()));
        let generated = reader
            .generated_images()
            .map_err(|err| RunError::input(input, err))?;
        for image in generated {
            if image.reused() {
                info!(path:? = image.path(); "Output is up to date");
            } else {
                info!(path:? = image.path(), description = image.description(); "Output written");
            }
            images.push(image);
        }
    }

    info!(count = images.len(); "All inputs processed");
    Ok(images)
}
