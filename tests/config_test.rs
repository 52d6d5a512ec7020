//! Integration tests for layered Settings loading.
//!
//! Precedence, lowest to highest:
//! - Built-in defaults
//! - Global file (`qtree.toml` in the platform config directory)
//! - Local file (`.qtree.toml` in the working or `-C` directory)
//! - `QTREE_*` environment variables (`__` separates sections)
//!
//! Every layer overrides per key; keys a layer does not set fall through.

use std::path::Path;

use tempfile::TempDir;

use qtree::application::services::BuildPolicy;
use qtree::application::ApplicationError;
use qtree::config::{local_config_path, Settings};

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).expect("write config file");
}

#[test]
fn given_global_and_local_files_when_loading_then_local_wins_per_key() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let global = temp.path().join("qtree.toml");
    write(
        &global,
        r#"
[oracle]
resolve_model = "global-model"

[tree]
concurrency = 8
build_policy = "partial"
"#,
    );
    write(
        &local_config_path(temp.path()),
        r#"
[tree]
concurrency = 2
"#,
    );

    // Act
    let settings = Settings::load_from(Some(&global), Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.oracle.resolve_model, "global-model");
    assert_eq!(settings.tree.concurrency, 2);
    assert_eq!(settings.tree.build_policy, BuildPolicy::Partial);
    // untouched keys keep their defaults
    assert_eq!(settings.oracle.decompose_model, "gpt-5-nano");
    assert_eq!(settings.oracle.tool_call_budget, 2);
}

#[test]
fn given_missing_files_when_loading_then_defaults() {
    let temp = TempDir::new().unwrap();
    let settings =
        Settings::load_from(Some(&temp.path().join("absent.toml")), Some(temp.path())).unwrap();

    assert_eq!(settings.tree.max_depth_limit, 3);
    assert_eq!(settings.tree.default_depth, 2);
}

#[test]
fn given_invalid_toml_when_loading_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    write(&local_config_path(temp.path()), "[tree\nconcurrency = ");

    // Act
    let err = Settings::load_from(None, Some(temp.path())).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_zero_concurrency_in_file_when_loading_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    write(&local_config_path(temp.path()), "[tree]\nconcurrency = 0\n");

    // Act
    let err = Settings::load_from(None, Some(temp.path())).unwrap_err();

    // Assert
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn given_env_override_when_loading_then_env_wins_over_files() {
    // Arrange
    let temp = TempDir::new().unwrap();
    write(&local_config_path(temp.path()), "[evidence]\ntimeout_secs = 10\n");
    std::env::set_var("QTREE_EVIDENCE__TIMEOUT_SECS", "7");

    // Act
    let settings = Settings::load_from(None, Some(temp.path()));
    std::env::remove_var("QTREE_EVIDENCE__TIMEOUT_SECS");

    // Assert
    assert_eq!(settings.unwrap().evidence.timeout_secs, 7);
}

#[test]
fn given_settings_when_rendered_as_toml_then_reloadable() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = Settings::load_from(None, None).unwrap().redacted();
    write(&local_config_path(temp.path()), &settings.to_toml().unwrap());

    // Act
    let reloaded = Settings::load_from(None, Some(temp.path())).unwrap();

    // Assert
    assert_eq!(reloaded.tree, settings.tree);
    assert_eq!(reloaded.oracle.resolve_model, settings.oracle.resolve_model);
}
