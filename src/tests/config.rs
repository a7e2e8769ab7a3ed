//! Unit tests for launcher configuration.

use crate::server::{CONFIG_VERSION, LauncherConfig, LauncherError};

#[test]
fn given_missing_file_when_load_or_create_then_default_written() {
    let dir = tempfile::tempdir().unwrap();

    let config = LauncherConfig::load_or_create(dir.path()).unwrap();

    assert!(dir.path().join("config.toml").exists());
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8501);
    assert_eq!(config.update.check_timeout_secs, 3);
    assert!(config.update.enabled);
}

#[test]
fn given_existing_file_when_load_then_values_roundtrip() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = LauncherConfig::default();
    config.server.port = 9000;
    config.server.port_range = (9000, 9050);
    config.update.enabled = false;
    config.save(dir.path()).unwrap();

    let loaded = LauncherConfig::load_or_create(dir.path()).unwrap();

    assert_eq!(loaded.server.port, 9000);
    assert_eq!(loaded.server.port_range, (9000, 9050));
    assert!(!loaded.update.enabled);
}

#[test]
fn given_version_zero_file_when_load_then_migrated_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "version = 0\n").unwrap();

    let config = LauncherConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(config.version, CONFIG_VERSION);

    // Migration is persisted
    let content = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(content.contains(&format!("version = {CONFIG_VERSION}")));
}

#[test]
fn test_privileged_port_rejected() {
    let mut config = LauncherConfig::default();
    config.server.port = 80;

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_inverted_port_range_rejected() {
    let mut config = LauncherConfig::default();
    config.server.port_range = (9000, 8000);

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_zero_startup_timeout_rejected() {
    let mut config = LauncherConfig::default();
    config.timeouts.startup_timeout_secs = 0;

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_zero_shutdown_timeout_rejected() {
    let mut config = LauncherConfig::default();
    config.timeouts.shutdown_timeout_secs = 0;

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_zero_update_check_timeout_rejected() {
    let mut config = LauncherConfig::default();
    config.update.check_timeout_secs = 0;

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_privileged_port_range_rejected() {
    let mut config = LauncherConfig::default();
    config.server.port_range = (80, 8599);

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_non_loopback_host_rejected() {
    let mut config = LauncherConfig::default();
    config.server.host = "0.0.0.0".into();

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_enabled_update_without_manifest_url_rejected() {
    let mut config = LauncherConfig::default();
    config.update.manifest_url.clear();

    assert!(matches!(
        config.validate(),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_localhost_host_accepted() {
    let mut config = LauncherConfig::default();
    config.server.host = "localhost".into();

    assert!(config.validate().is_ok());
}

#[test]
fn given_garbage_file_when_load_then_config_invalid() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "this is {not} toml").unwrap();

    assert!(matches!(
        LauncherConfig::load_or_create(dir.path()),
        Err(LauncherError::ConfigInvalid { .. })
    ));
}
