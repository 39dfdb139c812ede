use crate::tv::button::{TvButton, TvInput};
use crate::tv::requests::{
    LaunchBrowserRequest, OneShotResponse, OpenChannelRequest, SET_MUTE, SET_VOLUME,
    SCREEN_OFF, SetMuteRequest, SwitchInputRequest,
};
use crate::ip_control::IpControlKey;
use crate::rs232::Rs232Command;
use crate::webos::pairing::PairingRequest;

use serde_json::{Value, json};

/// **VALUE**: Mute and volume go to their own URIs.
///
/// **BUG THIS CATCHES**: A mute command that actually sets the volume.
#[test]
fn given_mute_request_when_serialized_then_uses_set_mute_uri_and_payload() {
    let payload = serde_json::to_value(SetMuteRequest { mute: true }).unwrap();

    assert_eq!(SET_MUTE, "ssap://audio/setMute");
    assert_ne!(SET_MUTE, SET_VOLUME);
    assert_eq!(payload, json!({ "mute": true }));
}

#[test]
fn given_uri_constants_then_match_device_service_paths() {
    assert_eq!(SET_VOLUME, "ssap://audio/setVolume");
    assert_eq!(SCREEN_OFF, "ssap://com.webos.service.tvpower/power/turnOffScreen");
}

#[test]
fn given_browser_launch_when_serialized_then_target_appears_twice() {
    let payload = serde_json::to_value(LaunchBrowserRequest::new("https://example.org")).unwrap();

    assert_eq!(
        payload,
        json!({
            "id": "com.webos.app.browser",
            "target": "https://example.org",
            "params": { "target": "https://example.org" }
        })
    );
}

#[test]
fn given_channel_and_input_requests_when_serialized_then_use_camel_case_strings() {
    let channel = serde_json::to_value(OpenChannelRequest {
        channel_number: 7.to_string(),
    })
    .unwrap();
    let input = serde_json::to_value(SwitchInputRequest { input_id: "HDMI_2" }).unwrap();

    assert_eq!(channel, json!({ "channelNumber": "7" }));
    assert_eq!(input, json!({ "inputId": "HDMI_2" }));
    assert_eq!(TvInput::Hdmi2.input_id(), Some("HDMI_2"));
    assert_eq!(TvInput::LiveTv.input_id(), None);
}

#[test]
fn given_one_shot_payload_when_deserialized_then_image_uri_extracted() {
    let response: OneShotResponse =
        serde_json::from_value(json!({ "imageUri": "http://tv/shot.jpg", "returnValue": true }))
            .unwrap();

    assert_eq!(response.image_uri, "http://tv/shot.jpg");
}

/// **VALUE**: Pins the parts of the pairing payload the TV checks.
///
/// **WHY THIS MATTERS**: The manifest is signed; a renamed key or reordered
/// locale map means the TV rejects the registration without explanation.
///
/// **BUG THIS CATCHES**: camelCase vs kebab-case slips (`client-key`), a lost
/// empty-string locale key, or a truncated permission list.
#[test]
fn given_pairing_request_when_serialized_then_manifest_fields_are_exact() {
    // GIVEN: A request with a stored key
    let request = PairingRequest::new("stored-key");

    // WHEN: Serializing
    let payload: Value = serde_json::to_value(&request).unwrap();

    // THEN: Top level and signed block carry the expected values
    assert_eq!(payload["forcePairing"], json!(false));
    assert_eq!(payload["pairingType"], json!("PROMPT"));
    assert_eq!(payload["client-key"], json!("stored-key"));

    let manifest = &payload["manifest"];
    assert_eq!(manifest["manifestVersion"], json!(1));
    assert_eq!(manifest["appVersion"], json!("1.1"));
    assert_eq!(manifest["permissions"].as_array().unwrap().len(), 52);
    assert_eq!(manifest["signatures"][0]["signatureVersion"], json!(1));

    let signed = &manifest["signed"];
    assert_eq!(signed["appId"], json!("com.lge.test"));
    assert_eq!(signed["localizedAppNames"][""], json!("LG Remote App"));
    assert_eq!(signed["localizedVendorNames"][""], json!("LG Electronics"));
    assert_eq!(signed["permissions"].as_array().unwrap().len(), 16);
    assert_eq!(signed["serial"], json!("2f930e2d2cfe083771f68e4fe7bb07"));
}

#[test]
fn given_buttons_when_mapped_then_side_channel_codes_match() {
    assert_eq!(TvButton::Enter.ip_control_key(), IpControlKey::Ok);
    assert_eq!(TvButton::Back.ip_control_key().code(), "returnback");
    assert_eq!(TvButton::Menu.rs232_command().text(), "mc 1 43");
    assert_eq!(TvButton::Left.rs232_command(), Rs232Command::Left);
    assert_eq!(Rs232Command::Left.text(), "mc 1 07");
    assert_eq!(Rs232Command::Right.text(), "mc 1 06");
}
