use form_core::config::AppConfig;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_parse_full_config() {
    let json = r#"{
        "storage": {
            "data_dir": "/var/lib/forms"
        },
        "delivery": {
            "default_timeout_ms": 15000,
            "connect_timeout_ms": 2000,
            "user_agent": "forms-test/1.0"
        }
    }"#;

    let config = AppConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/forms"));
    assert_eq!(config.delivery.default_timeout_ms, 15000);
    assert_eq!(config.delivery.connect_timeout_ms, 2000);
    assert_eq!(config.delivery.user_agent, "forms-test/1.0");
}

#[test]
fn test_parse_minimal_config() {
    // Only the storage section is required
    let json = r#"{
        "storage": {
            "path": "./data"
        }
    }"#;

    let config = AppConfig::from_json_str(json).expect("Failed to parse minimal config");

    assert_eq!(config.storage.data_dir, PathBuf::from("./data"), "path should map to data_dir");
    assert_eq!(config.delivery.default_timeout_ms, 30_000, "Delivery should default to 30s");
    assert_eq!(config.delivery.connect_timeout_ms, 10_000);
    assert!(config.delivery.user_agent.starts_with("form-pipeline/"));
}

#[test]
fn test_rejects_zero_timeout() {
    let json = r#"{
        "storage": { "data_dir": "./data" },
        "delivery": { "default_timeout_ms": 0 }
    }"#;

    let err = AppConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("default_timeout_ms"));
}

#[test]
fn test_rejects_empty_data_dir() {
    let json = r#"{ "storage": { "data_dir": "" } }"#;

    assert!(AppConfig::from_json_str(json).is_err());
}

#[test]
fn test_missing_storage_section_fails() {
    let json = r#"{ "delivery": { "default_timeout_ms": 1000 } }"#;

    assert!(AppConfig::from_json_str(json).is_err());
}

#[test]
fn test_from_file_with_env_override() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "storage": {{ "data_dir": "/srv/forms" }}, "delivery": {{ "connect_timeout_ms": 4000 }} }}"#
    )
    .unwrap();

    std::env::set_var("FORMS__DELIVERY__CONNECT_TIMEOUT_MS", "2500");
    let result = AppConfig::from_file(file.path());
    std::env::remove_var("FORMS__DELIVERY__CONNECT_TIMEOUT_MS");

    let config = result.expect("Failed to load config file");
    assert_eq!(config.storage.data_dir, PathBuf::from("/srv/forms"));
    assert_eq!(config.delivery.connect_timeout_ms, 2500, "environment should override the file");
    assert_eq!(config.delivery.default_timeout_ms, 30_000);
}

#[test]
fn test_from_file_missing() {
    let err = AppConfig::from_file("/nonexistent/forms.json").unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}
