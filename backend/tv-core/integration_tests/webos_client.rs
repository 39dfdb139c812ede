use crate::helpers::{FakeTv, WAIT, eventually, id_of, pairing_prompt, registered, response};

use tv_core::error::protocol::ProtocolError;
use tv_core::webos::{ClientState, Envelope, WebOsClient, WebOsConnection};

use common::RedactedSecret;

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct VolumeStatus {
    volume: u8,
    muted: bool,
}

async fn wait_for(client: &WebOsClient, target: ClientState) {
    let mut state = client.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("Client never reached {target}"))
        .unwrap();
}

/// Connect and register with a known key so the client ends up `Ready`.
async fn ready_client(tv: &mut FakeTv) -> WebOsClient {
    let client = WebOsClient::new(WebOsConnection::new("127.0.0.1", tv.port).unwrap());
    client.connect().await.unwrap();
    tv.expect_accepted().await;
    wait_for(&client, ClientState::Connected).await;

    client
        .register(Some(&RedactedSecret::new("KEY-1")), None)
        .await
        .unwrap();
    let register = tv.expect_json().await;
    tv.send(registered(&id_of(&register), "KEY-1"));
    wait_for(&client, ClientState::Ready).await;

    client
}

// ============================================
// PAIRING
// ============================================

/// **VALUE**: The full first-time pairing handshake drives the client state
/// machine and hands out the new key.
///
/// **BUG THIS CATCHES**: A prompt that is not recognised leaves callers
/// waiting forever; a key that is not published is lost on restart.
#[tokio::test]
async fn given_no_client_key_when_user_accepts_prompt_then_ready_with_new_key() {
    // GIVEN a connected client listening for keys
    let mut tv = FakeTv::start().await;
    let client = WebOsClient::new(WebOsConnection::new("127.0.0.1", tv.port).unwrap());
    let (sender, mut keys) = mpsc::unbounded_channel();
    let _subscription = client.on_client_key_changed().subscribe(move |key: RedactedSecret| {
        let _ = sender.send(key.expose().to_string());
        async { Ok(()) }
    });
    client.connect().await.unwrap();
    tv.expect_accepted().await;
    wait_for(&client, ClientState::Connected).await;

    // WHEN it registers without a key
    client.register(None, None).await.unwrap();
    let register = tv.expect_json().await;

    // THEN the register envelope asks for a prompt
    assert_eq!(register["type"], "register");
    assert_eq!(register["payload"]["client-key"], "");
    assert_eq!(register["payload"]["pairingType"], "PROMPT");

    // WHEN the TV shows the prompt and the user accepts
    let id = id_of(&register);
    tv.send(pairing_prompt(&id));
    wait_for(&client, ClientState::Pairing).await;
    tv.send(registered(&id, "NEW-KEY"));

    // THEN the client is ready and the key is published
    wait_for(&client, ClientState::Ready).await;
    let key = tokio::time::timeout(WAIT, keys.recv()).await.unwrap();
    assert_eq!(key.as_deref(), Some("NEW-KEY"));

    client.close().await;
    assert_eq!(client.state(), ClientState::Disconnected);
}

#[tokio::test]
async fn given_started_client_when_connecting_again_then_already_connected() {
    let mut tv = FakeTv::start().await;
    let client = WebOsClient::new(WebOsConnection::new("127.0.0.1", tv.port).unwrap());
    client.connect().await.unwrap();
    tv.expect_accepted().await;

    let second = client.connect().await;

    assert!(matches!(second, Err(ProtocolError::AlreadyConnected { .. })));
    client.close().await;
}

#[tokio::test]
async fn given_client_not_connected_when_requesting_then_not_ready() {
    let tv = FakeTv::start().await;
    let client = WebOsClient::new(WebOsConnection::new("127.0.0.1", tv.port).unwrap());

    let result = client
        .request("ssap://audio/volumeUp", None::<Value>, None)
        .await;

    assert!(matches!(result, Err(ProtocolError::NotReady { .. })));
}

// ============================================
// REQUESTS
// ============================================

#[tokio::test]
async fn given_ready_client_when_request_answered_then_typed_payload_returned() {
    // GIVEN a ready client
    let mut tv = FakeTv::start().await;
    let client = ready_client(&mut tv).await;

    // WHEN it asks for the volume and the TV answers
    let (status, request) = tokio::join!(
        client.request_for::<_, VolumeStatus>("ssap://audio/getVolume", None::<Value>, None),
        async {
            let request = tv.expect_json().await;
            tv.send(response(&id_of(&request), json!({ "volume": 12, "muted": false })));
            request
        }
    );

    // THEN the request was well formed and the payload decoded
    assert_eq!(request["type"], "request");
    assert_eq!(request["uri"], "ssap://audio/getVolume");
    assert!(request.get("payload").is_none());

    let status = status.unwrap();
    assert_eq!(status.volume, 12);
    assert!(!status.muted);
    assert_eq!(client.pending().await, 0);

    client.close().await;
}

#[tokio::test]
async fn given_ready_client_when_tv_answers_with_error_then_remote_error() {
    let mut tv = FakeTv::start().await;
    let client = ready_client(&mut tv).await;

    let (result, _) = tokio::join!(
        client.request_for::<_, Value>("ssap://system/turnOff", None::<Value>, None),
        async {
            let request = tv.expect_json().await;
            tv.send(
                json!({
                    "id": id_of(&request),
                    "type": "error",
                    "error": "401 insufficient permissions"
                })
                .to_string(),
            );
        }
    );

    match result {
        Err(ProtocolError::Remote { message, .. }) => assert!(message.contains("401")),
        other => panic!("Expected a remote error, got {other:?}"),
    }
    client.close().await;
}

/// **VALUE**: A waiter never hangs on a session that is gone.
///
/// **BUG THIS CATCHES**: Pending entries surviving a disconnect would keep
/// their waiters blocked forever (and later collide with reused ids).
#[tokio::test]
async fn given_pending_request_when_socket_drops_then_session_reset() {
    // GIVEN a ready client with one unanswered request
    let mut tv = FakeTv::start().await;
    let client = ready_client(&mut tv).await;

    // WHEN the TV drops the socket instead of answering
    let (result, _) = tokio::join!(
        client.request_for::<_, Value>("ssap://audio/getVolume", None::<Value>, None),
        async {
            tv.expect_json().await;
            tv.drop_connection();
        }
    );

    // THEN the waiter is released with SessionReset
    assert!(matches!(result, Err(ProtocolError::SessionReset { .. })));
    assert_eq!(client.pending().await, 0);

    client.close().await;
}

/// **VALUE**: Losing the transport takes a ready client out of `Ready`.
///
/// **BUG THIS CATCHES**: A client that keeps reporting `Ready` while its socket
/// is gone, so callers send into a dead session instead of re-registering.
#[tokio::test]
async fn given_ready_client_when_socket_drops_then_disconnected_before_reconnecting() {
    // GIVEN a ready client recording its state changes
    let mut tv = FakeTv::start().await;
    let client = ready_client(&mut tv).await;
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let _subscription = client.on_state_changed().subscribe(move |state| {
        sink.lock().unwrap().push(state);
        async { Ok(()) }
    });

    // WHEN the TV drops the socket
    tv.drop_connection();
    tv.expect_closed().await;
    tv.expect_accepted().await;
    eventually("reconnect", || states.lock().unwrap().len() == 3).await;

    // THEN Ready gave way to Disconnected before the new session came up
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            ClientState::Disconnected,
            ClientState::Connecting,
            ClientState::Connected,
        ]
    );

    client.close().await;
}

// ============================================
// SUBSCRIPTIONS
// ============================================

#[tokio::test]
async fn given_subscription_when_unsubscribed_then_later_updates_are_dropped() {
    // GIVEN a ready client subscribed to volume changes
    let mut tv = FakeTv::start().await;
    let client = ready_client(&mut tv).await;
    let (sender, mut volumes) = mpsc::unbounded_channel();

    let id = client
        .subscribe(
            "ssap://audio/getVolume",
            None::<Value>,
            move |envelope: Envelope<VolumeStatus>| {
                let sender = sender.clone();
                async move {
                    if let Some(status) = envelope.payload {
                        let _ = sender.send(status.volume);
                    }
                    Ok(())
                }
            },
            None,
        )
        .await
        .unwrap();

    let subscribe = tv.expect_json().await;
    assert_eq!(subscribe["type"], "subscribe");
    assert_eq!(id_of(&subscribe), id);

    // WHEN two updates arrive
    tv.send(response(&id, json!({ "volume": 5, "muted": false })));
    tv.send(response(&id, json!({ "volume": 6, "muted": false })));

    // THEN both reach the handler in order
    assert_eq!(tokio::time::timeout(WAIT, volumes.recv()).await.unwrap(), Some(5));
    assert_eq!(tokio::time::timeout(WAIT, volumes.recv()).await.unwrap(), Some(6));

    // WHEN the subscription is removed and another update arrives
    assert!(client.unsubscribe(&id).await);
    assert!(!client.unsubscribe(&id).await);
    tv.send(response(&id, json!({ "volume": 7, "muted": false })));

    // THEN nothing more is delivered
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(volumes.try_recv().is_err());

    client.close().await;
}
