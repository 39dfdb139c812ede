use crate::error::TvctlError;

use tv_core::error::CoreError;
use tv_core::error::config::ConfigError;
use tv_core::error::tv::TvError;

use common::ErrorLocation;

/// **VALUE**: Errors serialize with a stable tag, so they can be emitted as
/// JSON by scripts wrapping the CLI.
///
/// **BUG THIS CATCHES**: Adding a non-serializable field to a variant.
#[test]
fn given_tvctl_error_when_serialized_then_tagged_json() {
    // GIVEN
    let err = TvctlError::NotReady {
        message: String::from("Test"),
        location: ErrorLocation::caller(),
    };

    // WHEN
    let json = serde_json::to_value(&err).unwrap();

    // THEN
    assert_eq!(json["type"], "NotReady");
    assert_eq!(json["data"]["message"], "Test");
}

#[test]
fn given_tv_timeout_when_converted_then_not_ready() {
    let err = TvError::Timeout {
        message: String::from("TV did not reach state ready"),
        location: ErrorLocation::caller(),
    };

    let converted = TvctlError::from(err);

    assert!(
        matches!(converted, TvctlError::NotReady { ref message, .. } if message.contains("ready"))
    );
}

#[test]
fn given_config_error_wrapped_anywhere_when_converted_then_config_variant() {
    let validation = || ConfigError::ValidationError {
        location: ErrorLocation::caller(),
        reason: String::from("host is not an IP address"),
    };

    assert!(matches!(TvctlError::from(validation()), TvctlError::Config { .. }));
    assert!(matches!(
        TvctlError::from(TvError::Config(validation())),
        TvctlError::Config { .. }
    ));
    assert!(matches!(
        TvctlError::from(CoreError::Config(validation())),
        TvctlError::Config { .. }
    ));
}

#[test]
fn given_other_tv_error_when_converted_then_core_variant_keeps_message() {
    let err = TvError::ChannelDisabled {
        message: String::from("no side channel is enabled"),
        location: ErrorLocation::caller(),
    };

    let converted = TvctlError::from(err);

    match converted {
        TvctlError::Core { message, .. } => assert!(message.contains("no side channel")),
        other => panic!("Expected Core, got {other:?}"),
    }
}
