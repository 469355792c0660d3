//! Integration tests for bootstrap configuration and data folder resolution
//!
//! Tests that manipulate SYNESTHESIA_DATA_DIR are marked with #[serial]
//! so they do not race each other on the process environment.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use synesthesia_common::config::{
    default_data_dir, load_toml_config, resolve_data_dir, TomlConfig, DATA_DIR_ENV,
};
use synesthesia_common::Error;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(DATA_DIR_ENV, "/tmp/synesthesia-env");
    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/synesthesia-toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_data_dir(Some(Path::new("/tmp/synesthesia-cli")), &config);
    assert_eq!(resolved, PathBuf::from("/tmp/synesthesia-cli"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(DATA_DIR_ENV, "/tmp/synesthesia-env");
    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/synesthesia-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_data_dir(None, &config), PathBuf::from("/tmp/synesthesia-env"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(DATA_DIR_ENV);

    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/synesthesia-toml")),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_data_dir(None, &config), PathBuf::from("/tmp/synesthesia-toml"));

    assert_eq!(resolve_data_dir(None, &TomlConfig::default()), default_data_dir());
}

#[test]
fn test_load_explicit_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = 7000\nmax_revisions_per_file = 12\n").unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.port, 7000);
    assert_eq!(config.max_revisions_per_file, 12);
    assert_eq!(config.data_dir, None);
}

#[test]
fn test_missing_explicit_config_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    assert!(matches!(load_toml_config(Some(&path)), Err(Error::Config(_))));
}
