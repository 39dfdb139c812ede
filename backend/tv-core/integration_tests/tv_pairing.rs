use crate::helpers::{FakeTv, LinePeer, WAIT, id_of, pairing_prompt, registered};

use tv_core::error::tv::TvError;
use tv_core::tv::{TvButton, TvClient, TvOptions};
use tv_core::webos::ClientState;

use common::RedactedSecret;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::sync::mpsc;

fn local_options() -> TvOptions {
    TvOptions::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

// ============================================
// PAIRING AUTO-ACCEPT
// ============================================

/// **VALUE**: First-time pairing completes without anyone touching the TV.
///
/// **WHY THIS MATTERS**: The TV only accepts the prompt through its remote;
/// the client presses Down, waits for the focus to settle, then Enter over
/// RS232. Pressing both at once leaves the prompt open.
#[tokio::test]
async fn given_rs232_enabled_when_prompt_shown_then_accept_sequence_sent_and_client_ready() {
    // GIVEN a TV client wired to a fake TV and an RS232 peer
    let mut tv = FakeTv::start().await;
    let mut serial = LinePeer::start().await;
    let mut options = local_options();
    options.webos_port = tv.port;
    options.rs232_port = serial.port;
    let client = TvClient::new(options).unwrap();

    let (auth_sender, mut auth_requests) = mpsc::unbounded_channel();
    let _auth = client.on_authenticate_requested().subscribe(move |()| {
        let _ = auth_sender.send(());
        async { Ok(()) }
    });
    let (key_sender, mut keys) = mpsc::unbounded_channel();
    let _keys = client.on_client_key_changed().subscribe(move |key: RedactedSecret| {
        let _ = key_sender.send(key.expose().to_string());
        async { Ok(()) }
    });

    // WHEN it connects and authenticates without a key
    client.connect().await.unwrap();
    tv.expect_accepted().await;
    tokio::time::timeout(WAIT, auth_requests.recv()).await.unwrap();
    client.authenticate(None).await.unwrap();
    let register = tv.expect_json().await;
    let id = id_of(&register);

    // AND the TV shows its prompt
    tv.send(pairing_prompt(&id));

    // THEN Down then Enter arrive over RS232, about two seconds apart
    let (first, first_at) = serial.next_line().await;
    let (second, second_at) = serial.next_line().await;
    assert_eq!(first, "mc 1 41\r\n");
    assert_eq!(second, "mc 1 44\r\n");
    assert!(second_at.duration_since(first_at) >= Duration::from_millis(1_900));

    // WHEN the TV accepts the pairing
    tv.send(registered(&id, "FRESH-KEY"));

    // THEN the client is ready and the key is forwarded
    client
        .wait_for_state(ClientState::Ready, WAIT)
        .await
        .unwrap();
    let key = tokio::time::timeout(WAIT, keys.recv()).await.unwrap();
    assert_eq!(key.as_deref(), Some("FRESH-KEY"));

    // AND commands now reach the TV
    client.show_toast("Paired").await.unwrap();
    let toast = tv.expect_json().await;
    assert_eq!(toast["uri"], "ssap://system.notifications/createToast");
    assert_eq!(toast["payload"]["message"], "Paired");

    client.close().await;
}

// ============================================
// GUARDS
// ============================================

#[tokio::test]
async fn given_client_not_ready_when_command_issued_then_not_ready() {
    let mut tv = FakeTv::start().await;
    let mut options = local_options();
    options.webos_port = tv.port;
    let client = TvClient::new(options).unwrap();
    client.connect().await.unwrap();
    tv.expect_accepted().await;

    let result = client.set_volume(20).await;

    assert!(matches!(result, Err(TvError::NotReady { .. })));
    client.close().await;
}

#[tokio::test]
async fn given_no_side_channel_when_pressing_button_then_channel_disabled() {
    let mut options = local_options();
    options.use_rs232 = false;
    options.use_ip_control = false;
    let client = TvClient::new(options).unwrap();

    let result = client.press_button(TvButton::Menu).await;

    assert!(matches!(result, Err(TvError::ChannelDisabled { .. })));
}

#[tokio::test]
async fn given_ip_control_without_keycode_when_pressing_button_then_channel_disabled() {
    let mut options = local_options();
    options.use_rs232 = false;
    options.use_ip_control = true;
    let client = TvClient::new(options).unwrap();

    let result = client.press_button(TvButton::Enter).await;

    assert!(matches!(result, Err(TvError::ChannelDisabled { .. })));
}

#[tokio::test]
async fn given_rs232_enabled_when_pressing_button_then_command_line_sent() {
    // GIVEN a client whose only side channel is RS232
    let mut serial = LinePeer::start().await;
    let mut options = local_options();
    options.rs232_port = serial.port;
    let client = TvClient::new(options).unwrap();

    // WHEN a button is pressed
    client.press_button(TvButton::VolumeUp).await.unwrap();

    // THEN the matching command arrives on a fresh connection
    assert_eq!(serial.next_line().await.0, "mc 1 02\r\n");
}
