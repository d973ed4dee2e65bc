//! Integration tests for config file loading and root folder resolution

use menulens_common::config::{
    database_path, load_toml_config, resolve_root_folder, write_toml_config, ScanSection,
    TomlConfig,
};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROOT_ENV: &str = "MENULENS_TEST_ROOT_FOLDER";

#[test]
fn test_write_then_load_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/menulens")),
        scan: ScanSection {
            extraction_provider: Some("cloud-vision-groq".to_string()),
            batch_size: Some(3),
            ..Default::default()
        },
        ..Default::default()
    };

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(!path.with_extension("toml.tmp").exists(), "temp file should be renamed away");
}

#[test]
fn test_partial_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[scan]\nlazy_enrichment = false\n").unwrap();

    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded.scan.lazy_enrichment, Some(false));
    assert_eq!(loaded.scan.batch_size, None);
    assert_eq!(loaded.logging.level, "info");
    assert!(loaded.providers.groq_api_key.is_none());
}

#[test]
fn test_malformed_config_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[scan\nbatch_size = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, menulens_common::Error::Config(_)));
}

#[test]
#[serial]
fn test_root_folder_cli_wins() {
    std::env::set_var(ROOT_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), ROOT_ENV, &toml);
    std::env::remove_var(ROOT_ENV);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_root_folder_env_then_toml() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    std::env::set_var(ROOT_ENV, "/from/env");
    assert_eq!(resolve_root_folder(None, ROOT_ENV, &toml), PathBuf::from("/from/env"));

    std::env::remove_var(ROOT_ENV);
    assert_eq!(resolve_root_folder(None, ROOT_ENV, &toml), PathBuf::from("/from/toml"));
}

#[test]
fn test_database_path() {
    assert_eq!(
        database_path(Path::new("/srv/menulens")),
        PathBuf::from("/srv/menulens/menulens.db")
    );
}
