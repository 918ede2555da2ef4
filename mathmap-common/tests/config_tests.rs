//! Unit tests for configuration resolution
//!
//! Tests cover:
//! - Missing TOML files do not prevent startup
//! - Priority order: command line > environment > TOML > compiled default
//! - Invalid TOML is reported as a configuration error
//!
//! Note: Uses serial_test to prevent ENV variable races. Tests that touch
//! `MATHMAP_*` variables are marked #[serial].

use mathmap_common::config::{
    load_toml_config, ConfigOverrides, ServiceConfig, TomlConfig, DEFAULT_ENDPOINT_URL,
};
use mathmap_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

const ENV_VARS: &[&str] = &[
    "MATHMAP_CONFIG",
    "MATHMAP_DATABASE_PATH",
    "MATHMAP_BIND_ADDRESS",
    "MATHMAP_LLM_API_KEY",
    "MATHMAP_LLM_ENDPOINT_URL",
    "MATHMAP_LLM_TIMEOUT_SECS",
    "MATHMAP_TESSERACT_PATH",
    "MATHMAP_OCR_LANGUAGE_HINT",
    "MATHMAP_JWT_SECRET",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write_toml(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write toml");
    file
}

const SAMPLE_TOML: &str = r#"
database_path = "/tmp/mathmap-toml.db"
bind_address = "0.0.0.0:9000"

[llm]
api_key = "toml-key"
endpoint_url = "http://llm.internal/v1/chat/completions"
timeout_secs = 45
model = "deepseek-reasoner"

[ocr]
language_hint = "eng"

[auth]
access_token_ttl_secs = 600
"#;

#[test]
fn test_toml_parses_all_sections() {
    let file = write_toml(SAMPLE_TOML);
    let toml_config = load_toml_config(file.path()).expect("valid toml");

    assert_eq!(toml_config.database_path, Some(PathBuf::from("/tmp/mathmap-toml.db")));
    assert_eq!(toml_config.llm.api_key.as_deref(), Some("toml-key"));
    assert_eq!(toml_config.llm.timeout_secs, Some(45));
    assert_eq!(toml_config.ocr.language_hint.as_deref(), Some("eng"));
    assert_eq!(toml_config.auth.access_token_ttl_secs, Some(600));
    assert!(toml_config.auth.jwt_secret.is_none());
}

#[test]
fn test_empty_toml_is_valid() {
    let file = write_toml("");
    let toml_config = load_toml_config(file.path()).expect("empty toml is valid");
    assert!(toml_config.database_path.is_none());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let file = write_toml("[llm\napi_key = ");
    let result = load_toml_config(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_merge_toml_over_defaults() {
    let file = write_toml(SAMPLE_TOML);
    let toml_config = load_toml_config(file.path()).unwrap();

    let config = ServiceConfig::merge(ConfigOverrides::default(), toml_config);

    assert_eq!(config.bind_address, "0.0.0.0:9000");
    assert_eq!(config.llm.model, "deepseek-reasoner");
    assert_eq!(config.llm.timeout_secs, 45);
    // Unset values keep compiled defaults
    assert_eq!(config.llm.max_tokens, 2000);
    assert_eq!(config.auth.refresh_token_ttl_secs, 86400);
}

#[test]
fn test_merge_overrides_beat_toml() {
    let file = write_toml(SAMPLE_TOML);
    let toml_config = load_toml_config(file.path()).unwrap();

    let overrides = ConfigOverrides {
        api_key: Some("cli-key".to_string()),
        language_hint: Some("chi_sim".to_string()),
        ..Default::default()
    };
    let config = ServiceConfig::merge(overrides, toml_config);

    assert_eq!(config.llm.api_key, "cli-key");
    assert_eq!(config.ocr.language_hint, "chi_sim");
    assert_eq!(config.llm.endpoint_url, "http://llm.internal/v1/chat/completions");
}

#[test]
#[serial]
fn test_resolve_without_any_config_uses_defaults() {
    clear_env();
    let missing = PathBuf::from("/nonexistent/mathmap/config.toml");

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: Some(missing),
        ..Default::default()
    })
    .expect("missing config file is not fatal");

    assert_eq!(config.llm.endpoint_url, DEFAULT_ENDPOINT_URL);
    assert_eq!(config.llm.timeout_secs, 30);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    clear_env();
    let file = write_toml(SAMPLE_TOML);
    env::set_var("MATHMAP_CONFIG", file.path());
    env::set_var("MATHMAP_LLM_API_KEY", "env-key");
    env::set_var("MATHMAP_LLM_TIMEOUT_SECS", "12");

    let config = ServiceConfig::resolve(ConfigOverrides::default()).unwrap();

    assert_eq!(config.llm.api_key, "env-key");
    assert_eq!(config.llm.timeout_secs, 12);
    assert_eq!(config.bind_address, "0.0.0.0:9000");

    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env();
    env::set_var("MATHMAP_LLM_API_KEY", "env-key");

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/config.toml")),
        api_key: Some("cli-key".to_string()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.llm.api_key, "cli-key");

    clear_env();
}

#[test]
#[serial]
fn test_unparsable_env_timeout_is_ignored() {
    clear_env();
    env::set_var("MATHMAP_LLM_TIMEOUT_SECS", "soon");

    let overrides = ConfigOverrides::from_env();
    assert!(overrides.timeout_secs.is_none());

    clear_env();
}

#[test]
fn test_default_toml_config_is_empty() {
    let toml_config = TomlConfig::default();
    let config = ServiceConfig::merge(ConfigOverrides::default(), toml_config);
    assert!(config.validate().is_ok());
}
