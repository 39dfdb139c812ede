use crate::error::TvctlError;
use crate::runner::{persist_client_key, wire_session, with_host_override};

use tv_core::config::AppConfig;
use tv_core::tv::{TvClient, TvOptions};

use common::RedactedSecret;

use std::sync::Mutex;

fn configured() -> AppConfig {
    let mut config = AppConfig::default();
    config.tv.host = String::from("192.168.1.20");
    config
}

#[test]
fn given_host_flag_when_overriding_then_host_replaced() {
    let config = with_host_override(configured(), Some(String::from("10.0.0.5"))).unwrap();

    assert_eq!(config.tv.host, "10.0.0.5");
}

#[test]
fn given_invalid_host_flag_when_overriding_then_config_error() {
    let result = with_host_override(configured(), Some(String::from("living-room")));

    assert!(matches!(result, Err(TvctlError::Config { .. })));
}

/// **VALUE**: A key issued during pairing survives the process.
///
/// **BUG THIS CATCHES**: Forgetting to save (the TV prompts again on every
/// run) or rewriting the file when the TV merely confirms the stored key.
#[test]
fn given_new_client_key_when_persisted_then_saved_once() {
    // GIVEN: A config without a key
    let dir = tempfile::tempdir().unwrap();
    let config = Mutex::new(configured());
    let key = RedactedSecret::new("issued-key");

    // WHEN: The TV issues a key
    persist_client_key(&config, dir.path(), &key).unwrap();

    // THEN: It is on disk
    let reloaded = AppConfig::load(dir.path()).unwrap();
    assert_eq!(reloaded.client_key(), Some(key.clone()));

    // WHEN: The same key is confirmed after the file is removed
    std::fs::remove_file(dir.path().join("config.json")).unwrap();
    persist_client_key(&config, dir.path(), &key).unwrap();

    // THEN: Nothing is rewritten
    assert!(!dir.path().join("config.json").exists());
}

/// **VALUE**: The wired key listener has saved the key by the time the
/// publish that carried it returns.
///
/// **BUG THIS CATCHES**: A save handed to the blocking pool without awaiting
/// it, letting the command finish (and the process exit) before the write.
#[tokio::test]
async fn given_wired_session_when_key_published_then_saved_before_publish_returns() {
    // GIVEN: An offline client wired to a config directory
    let dir = tempfile::tempdir().unwrap();
    let config = configured();
    let client = TvClient::new(TvOptions::try_from(&config).unwrap()).unwrap();
    let wiring = wire_session(&client, config, dir.path().to_path_buf());

    // WHEN: A key is published
    client
        .on_client_key_changed()
        .publish(RedactedSecret::new("issued-key"))
        .await;

    // THEN: It is already on disk
    let reloaded = AppConfig::load(dir.path()).unwrap();
    assert_eq!(reloaded.client_key(), Some(RedactedSecret::new("issued-key")));

    drop(wiring);
}
