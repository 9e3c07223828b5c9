//! Command-line argument definitions for the Tracery CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input files, the output directory and
//! format, configuration file selection, and logging verbosity.

use std::path::PathBuf;

use clap::Parser;

use tracery::config::FileFormat;

/// Command-line arguments for the Tracery diagram tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Diagram source files
    #[arg(required = true, help = "Paths to the input files")]
    pub inputs: Vec<PathBuf>,

    /// Output directory; defaults to the directory of each input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (svg, graphml); defaults to the configured format
    #[arg(short, long)]
    pub format: Option<FileFormat>,

    /// Leave SVG outputs untouched when their source has not changed
    #[arg(long)]
    pub check_metadata: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
