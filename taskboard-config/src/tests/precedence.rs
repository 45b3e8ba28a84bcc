//! Tests for configuration precedence order

use crate::{ConfigError, ConfigProvider, FileDiscovery, StoreBackend};
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn provider_for(project: &Path, global: &Path) -> ConfigProvider {
    ConfigProvider::with_discovery(FileDiscovery::with_directories(
        Some(project.to_path_buf()),
        Some(global.to_path_buf()),
    ))
}

#[test]
#[serial]
fn test_defaults_without_files() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();

    let config = provider_for(project.path(), global.path()).load().unwrap();

    assert_eq!(config.sync.write_timeout_ms, 5_000);
    assert_eq!(config.store.backend, StoreBackend::File);
}

#[test]
#[serial]
fn test_project_overrides_global() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();

    fs::write(
        global.path().join("taskboard.toml"),
        r#"
[sync]
write_timeout_ms = 1000
max_concurrent_writes = 2

[logging]
level = "debug"
"#,
    )
    .unwrap();
    fs::write(
        project.path().join("taskboard.yaml"),
        "sync:\n  max_concurrent_writes: 8\n",
    )
    .unwrap();

    let config = provider_for(project.path(), global.path()).load().unwrap();

    assert_eq!(config.sync.max_concurrent_writes, 8);
    // Global-only values survive
    assert_eq!(config.sync.write_timeout_ms, 1000);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();

    fs::write(
        project.path().join("taskboard.json"),
        r#"{"sync": {"write_timeout_ms": 1500, "heal_dirty_containers": true}}"#,
    )
    .unwrap();

    std::env::set_var("TASKBOARD_SYNC__WRITE_TIMEOUT_MS", "250");
    std::env::set_var("TASKBOARD_STORE__BACKEND", "memory");

    let result = provider_for(project.path(), global.path()).load();

    std::env::remove_var("TASKBOARD_SYNC__WRITE_TIMEOUT_MS");
    std::env::remove_var("TASKBOARD_STORE__BACKEND");

    let config = result.unwrap();
    assert_eq!(config.sync.write_timeout_ms, 250);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert!(config.sync.heal_dirty_containers);
}

#[test]
#[serial]
fn test_invalid_values_fail_validation() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();

    fs::write(
        project.path().join("taskboard.toml"),
        "[sync]\nmax_concurrent_writes = 0\n",
    )
    .unwrap();

    let result = provider_for(project.path(), global.path()).load();
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
#[serial]
fn test_malformed_file_is_parse_error() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();

    fs::write(
        project.path().join("taskboard.toml"),
        "[sync]\nwrite_timeout_ms = \"soon\"\n",
    )
    .unwrap();

    let result = provider_for(project.path(), global.path()).load();
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}
