//! Configuration loading and data folder resolution
//!
//! Bootstrap configuration is deliberately small: where to listen, where cue files live,
//! how many revisions to keep per track, and logging. It comes from (highest priority first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default HTTP/WebSocket port
pub const DEFAULT_PORT: u16 = 9270;

/// Default number of in-memory revisions kept per track
pub const DEFAULT_MAX_REVISIONS_PER_FILE: usize = 30;

/// Environment variable naming the data folder
pub const DATA_DIR_ENV: &str = "SYNESTHESIA_DATA_DIR";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; missing fields take built-in defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Folder holding saved cue files
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Revision history cap per track
    #[serde(default = "default_max_revisions")]
    pub max_revisions_per_file: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: None,
            max_revisions_per_file: default_max_revisions(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_revisions_per_file == 0 {
            return Err(Error::Config(
                "max_revisions_per_file must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_revisions() -> usize {
    DEFAULT_MAX_REVISIONS_PER_FILE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a TOML bootstrap configuration string
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig =
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Load the TOML bootstrap configuration
///
/// An explicit path that cannot be read is an error. Without an explicit path the platform
/// config file is tried, and a missing or unreadable file falls back to defaults with a warning.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        return parse_toml_config(&content);
    }

    let Some(path) = default_config_file() else {
        return Ok(TomlConfig::default());
    };
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_toml_config(&content),
        Err(e) => {
            warn!("Failed to read config file {}: {}, using defaults", path.display(), e);
            Ok(TomlConfig::default())
        }
    }
}

/// Data folder resolution, in priority order:
/// 1. Command-line argument
/// 2. `SYNESTHESIA_DATA_DIR` environment variable
/// 3. `data_dir` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_data_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        return path.clone();
    }

    default_data_dir()
}

/// Platform config file location (`<config dir>/synesthesia/config.toml`)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("synesthesia").join("config.toml"))
}

/// Get OS-dependent default data folder path
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("synesthesia"))
        .unwrap_or_else(|| PathBuf::from("./synesthesia_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_revisions_per_file, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_toml() {
        let config = parse_toml_config(
            r#"
            port = 8123
            data_dir = "/srv/cues"
            max_revisions_per_file = 5

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/cues")));
        assert_eq!(config.max_revisions_per_file, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_revisions_rejected() {
        let err = parse_toml_config("max_revisions_per_file = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(parse_toml_config("port = \"abc\""), Err(Error::Config(_))));
    }
}
