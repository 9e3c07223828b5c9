//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use tracery::{TraceryError, config::AppConfig};

const LOCAL_CONFIG: &str = "tracery/config.toml";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for TraceryError {
    fn from(err: ConfigError) -> Self {
        TraceryError::Io(io::Error::other(err.to_string()))
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (tracery/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path to config file
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed or holds invalid values
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TraceryError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "tracery", "tracery") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if:
/// - File doesn't exist
/// - File cannot be read
/// - TOML parsing fails
/// - The background color is not a valid color
fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, TraceryError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content).map_err(Into::into)
}

fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig =
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    config
        .style()
        .background_color()
        .map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tracery::config::FileFormat;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r##"
[style]
background_color = "#fafafa"
font_family = "monospace"
font_size = 14.0

[output]
format = "graphml"
check_metadata = true
"##,
        )
        .unwrap();
        assert_eq!(config.style().font_family(), "monospace");
        assert_eq!(config.style().font_size(), 14.0);
        assert!(config.style().background_color().unwrap().is_some());
        assert_eq!(config.output().format(), FileFormat::Graphml);
        assert!(config.output().check_metadata());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.output().format(), FileFormat::Svg);
        assert!(!config.output().check_metadata());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse_config("[style]\nbackground_color = \"nope\""),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            parse_config("[output]\nformat = \"png\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[output]\nformat = \"graphml\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output().format(), FileFormat::Graphml);

        let missing = load_config(Some(dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(TraceryError::Io(_))));
    }
}
