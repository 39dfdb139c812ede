use crate::RedactedSecret;

/// **VALUE**: Verifies that neither Debug nor Display leak the secret.
///
/// **WHY THIS MATTERS**: The pairing client key is published through events and logged
/// state transitions. A leaked key lets anyone on the network drive the TV without a prompt.
///
/// **BUG THIS CATCHES**: Would catch a derived `Debug` replacing the manual implementation.
#[test]
fn given_secret_when_formatted_then_value_is_hidden() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("34398c8d7606340d55fc5cf5adad4d48");

    // WHEN: Formatting it both ways
    let debug = format!("{:?}", secret);
    let display = format!("{}", secret);

    // THEN: Neither contains the value
    assert!(!debug.contains("34398c8d"));
    assert!(!display.contains("34398c8d"));
    assert!(display.contains("REDACTED"));
}

/// **VALUE**: Verifies that serde refuses to serialize a secret.
///
/// **BUG THIS CATCHES**: Would catch a `#[derive(Serialize)]` sneaking in and writing the
/// key into an envelope or a config file without going through `expose()`.
#[test]
fn given_secret_when_serialized_then_fails() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("abc");

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&secret);

    // THEN: Serialization is rejected
    assert!(result.is_err(), "Secrets must be exposed explicitly");
}

#[test]
fn given_secret_when_exposed_then_returns_original_value() {
    let secret = RedactedSecret::new("abc");

    assert_eq!(secret.expose(), "abc");
    assert_eq!(secret.len(), 3);
    assert!(!secret.is_empty());
    assert!(RedactedSecret::new("").is_empty());
}
