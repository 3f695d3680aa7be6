use std::io::Write;

use cb_domain::config::{CombinerConfig, ConfigSeverity};
use cb_domain::Error;

#[test]
fn default_points_at_local_service() {
    let config = CombinerConfig::default();
    assert_eq!(config.base_url, "http://localhost:22003");
    assert_eq!(config.panel, "unknown");
    assert!(!config.test_mode);
    assert_eq!(config.channel.path, "/ws");
    assert_eq!(config.rest.timeout_ms, 8000);
    assert_eq!(config.rest.mock_delay_ms, 300);
}

#[test]
fn module_id_is_required() {
    let issues = CombinerConfig::default().validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "module_id" && i.severity == ConfigSeverity::Error));

    let config = CombinerConfig::for_module("www");
    assert!(config.validate().is_empty());
    assert!(config.ensure_valid().is_ok());
}

#[test]
fn parses_nested_sections() {
    let toml_str = r#"
base_url = "https://combiner.example.com"
module_id = "notes"
panel = "left"
test_mode = true

[channel]
path = "/bus"
max_reconnect_attempts = 2
reconnect_backoff_ms = 250

[rest.default_headers]
X-Tenant = "acme"
"#;
    let config = CombinerConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.base_url, "https://combiner.example.com");
    assert_eq!(config.module_id, "notes");
    assert_eq!(config.panel, "left");
    assert!(config.test_mode);
    assert_eq!(config.channel.path, "/bus");
    assert_eq!(config.channel.max_reconnect_attempts, Some(2));
    assert_eq!(config.channel.reconnect_backoff_ms, 250);
    assert_eq!(config.channel.max_reconnect_backoff_ms, 30_000);
    assert_eq!(
        config.rest.default_headers.get("X-Tenant").map(String::as_str),
        Some("acme")
    );
}

#[test]
fn rejects_non_http_base_url_and_inverted_backoff() {
    let mut config = CombinerConfig::for_module("www");
    config.base_url = "ws://localhost:22003".into();
    config.channel.reconnect_backoff_ms = 60_000;

    let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
    assert!(fields.contains(&"base_url".to_string()));
    assert!(fields.contains(&"channel.reconnect_backoff_ms".to_string()));
    assert!(matches!(config.ensure_valid(), Err(Error::Config(_))));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = CombinerConfig::from_toml_str("module_id = [").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "module_id = \"www\"\npanel = \"right\"").unwrap();

    let config = CombinerConfig::load(file.path()).unwrap();
    assert_eq!(config.module_id, "www");
    assert_eq!(config.panel, "right");
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CombinerConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
