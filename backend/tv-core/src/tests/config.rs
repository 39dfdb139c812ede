use crate::config::AppConfig;
use crate::error::config::ConfigError;
use crate::tv::options::{AcceptSequence, TvOptions};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: A first run works without any config file.
///
/// **BUG THIS CATCHES**: Treating a missing file as an error.
#[test]
fn given_no_config_file_when_loading_then_returns_defaults() {
    let dir = TempDir::new().unwrap();

    let config = AppConfig::load(dir.path()).unwrap();

    assert_eq!(config, AppConfig::default());
    assert_eq!(config.tv.webos_port, 3000);
    assert_eq!(config.tv.rs232_port, 9761);
    assert_eq!(config.tv.ip_control_port, 9761);
    assert!(config.tv.use_rs232);
    assert!(!config.tv.use_ip_control);
    assert_eq!(config.tv.accept_sequence, AcceptSequence::DownEnter);
    assert_eq!(config.tv.accept_delay_ms, 2000);
}

/// **VALUE**: The client key survives a save/load cycle.
///
/// **WHY THIS MATTERS**: Losing the key means the TV shows the pairing prompt
/// again on every start.
#[test]
fn given_saved_config_when_loading_then_values_round_trip() {
    // GIVEN: A config with host and client key
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.tv.host = "192.168.1.40".to_string();
    config.pairing.client_key = Some("abc123".to_string());

    // WHEN: Saving and loading it
    config.save(dir.path()).unwrap();
    let loaded = AppConfig::load(dir.path()).unwrap();

    // THEN: Same values, no temp file left behind
    assert_eq!(loaded, config);
    assert_eq!(loaded.client_key().unwrap().expose(), "abc123");
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn given_partial_json_when_loading_then_missing_fields_get_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"tv":{"host":"10.0.0.5","accept_sequence":"RightEnter"}}"#,
    )
    .unwrap();

    let config = AppConfig::load(dir.path()).unwrap();

    assert_eq!(config.version, 1);
    assert_eq!(config.tv.host, "10.0.0.5");
    assert_eq!(config.tv.accept_sequence, AcceptSequence::RightEnter);
    assert_eq!(config.tv.webos_port, 3000);
}

#[test]
fn given_corrupted_file_when_loading_then_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ nope").unwrap();

    let result = AppConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **BUG THIS CATCHES**: Enabling IP control without a keycode, which would
/// only fail later while the pairing prompt is already on screen.
#[test]
fn given_ip_control_without_key_when_validating_then_returns_validation_error() {
    let mut config = AppConfig::default();
    config.tv.use_ip_control = true;

    let result = config.validate();

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_invalid_values_when_validating_then_each_is_rejected() {
    let mut bad_host = AppConfig::default();
    bad_host.tv.host = "living-room-tv".to_string();

    let mut zero_port = AppConfig::default();
    zero_port.tv.webos_port = 0;

    let mut bad_version = AppConfig::default();
    bad_version.version = 7;

    for config in [bad_host, zero_port, bad_version] {
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}

#[test]
fn given_complete_config_when_building_options_then_fields_are_carried_over() {
    let mut config = AppConfig::default();
    config.tv.host = "192.168.1.40".to_string();
    config.tv.use_ip_control = true;
    config.tv.ip_control_key = Some("KEYCODE1".to_string());
    config.tv.accept_delay_ms = 500;

    let options = TvOptions::try_from(&config).unwrap();

    assert_eq!(options.address, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40)));
    assert!(options.use_ip_control);
    assert_eq!(options.ip_control_key.as_ref().unwrap().expose(), "KEYCODE1");
    assert_eq!(options.accept_delay, Duration::from_millis(500));
    assert_eq!(options.rs232_address().port(), 9761);
}

#[test]
fn given_empty_host_when_building_options_then_returns_validation_error() {
    let config = AppConfig::default();

    let result = TvOptions::try_from(&config);

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}
