//! Config file loading

use std::fs;

use strata_config::{ConfigError, Settings, StrataConfig, TickMode};

#[test]
fn file_values_flow_into_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[state]
root_key = "console"
scheduler = "immediate"

[fan_out]
concurrency = "6"
"#,
    )
    .unwrap();

    let config = StrataConfig::load_from(&path).unwrap();
    let settings = Settings::resolve_with(config.as_ref(), |_| None).unwrap();
    assert_eq!(settings.root_key, "console");
    assert_eq!(settings.tick_mode, TickMode::Immediate);
    assert_eq!(settings.concurrency.get(), 6);
}

#[test]
fn invalid_concurrency_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[fan_out]\nconcurrency = 1.1\n").unwrap();

    let config = StrataConfig::load_from(&path).unwrap();
    let err = Settings::resolve_with(config.as_ref(), |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::Concurrency(_)));
}
