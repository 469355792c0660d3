//! Server configuration
//!
//! Merges command-line arguments (which already include their environment-variable
//! fallbacks) with the TOML bootstrap file:
//! 1. Command-line arguments (--port, --data-dir, --max-revisions, --in-memory)
//! 2. Environment variables (SYNESTHESIA_PORT, SYNESTHESIA_DATA_DIR)
//! 3. TOML configuration file
//! 4. Built-in defaults

use std::path::PathBuf;
use synesthesia_common::config::{load_toml_config, resolve_data_dir, TomlConfig};

use crate::error::{Error, Result};

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub in_memory: bool,
    pub max_revisions: Option<usize>,
}

/// Where cue files are saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// `<data_dir>/cue-files/<id>.json`
    Files { data_dir: PathBuf },
    /// Nothing survives a restart
    Memory,
}

/// Resolved configuration the server runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub storage: StorageConfig,
    pub max_revisions: usize,
    pub log_level: String,
}

impl ServerConfig {
    /// Load the TOML file named by (or implied by) `cli` and apply the overrides
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let toml_config = load_toml_config(cli.config_file.as_deref())?;
        Self::from_parts(cli, &toml_config)
    }

    /// Apply command-line overrides on top of an already loaded TOML config
    pub fn from_parts(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let max_revisions = cli.max_revisions.unwrap_or(toml_config.max_revisions_per_file);
        if max_revisions == 0 {
            return Err(Error::Config(
                "max revisions per file must be at least 1".to_string(),
            ));
        }

        let storage = if cli.in_memory {
            StorageConfig::Memory
        } else {
            StorageConfig::Files {
                data_dir: resolve_data_dir(cli.data_dir.as_deref(), toml_config),
            }
        };

        Ok(Self {
            port: cli.port.unwrap_or(toml_config.port),
            storage,
            max_revisions,
            log_level: toml_config.logging.level.clone(),
        })
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn log_directive(&self) -> String {
        format!(
            "synesthesia_server={level},synesthesia_common={level},tower_http={level}",
            level = self.log_level
        )
    }
}
