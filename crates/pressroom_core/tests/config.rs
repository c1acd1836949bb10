use pressroom_core::config::{ConfigError, PressroomConfig};
use std::path::PathBuf;

#[test]
fn loads_a_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.production.json");
    std::fs::write(
        &path,
        r#"{
            "env": "production",
            "url": "https://news.example.com",
            "database": {"client": "sqlite3", "filename": "/var/lib/pressroom/site.db"},
            "logging": {"level": "warn", "dir": "/var/log/pressroom"},
            "labs": {"multipleProducts": true},
            "hostSettings": {"emailVerification": {"verified": true}}
        }"#,
    )
    .unwrap();

    let config = PressroomConfig::load(&path).unwrap();

    if std::env::var("PRESSROOM_ENV").is_err() {
        assert!(config.is_production());
    }
    assert_eq!(config.url, "https://news.example.com");
    assert_eq!(config.database.filename, "/var/lib/pressroom/site.db");
    assert!(!config.database.is_in_memory());
    assert_eq!(config.logging.level.as_deref(), Some("warn"));
    assert_eq!(
        config.logging.dir,
        Some(PathBuf::from("/var/log/pressroom"))
    );
    assert_eq!(config.labs.get("multipleProducts"), Some(&true));
    assert!(config.email_verified());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PressroomConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = PressroomConfig::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn for_env_uses_an_in_memory_database() {
    let config = PressroomConfig::for_env("testing");
    assert!(config.database.is_in_memory());
    assert!(config.is_testing());
    assert!(config.labs.is_empty());
}
