use crate::error::handler::HandlerError;
use crate::error::protocol::ProtocolError;
use crate::webos::client::Dispatch;
use crate::webos::correlation::CorrelationTable;
use crate::webos::subscription::{Completion, OneShot, ResponseHandler, TypedSubscription};
use crate::webos::{ClientState, Envelope, WebOsClient, WebOsConnection};

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct VolumeStatus {
    volume: u8,
}

fn offline_client() -> WebOsClient {
    WebOsClient::new(WebOsConnection::new("127.0.0.1", 3000).unwrap())
}

fn volume_recorder() -> (
    Arc<dyn ResponseHandler>,
    mpsc::UnboundedReceiver<Option<VolumeStatus>>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handler = TypedSubscription::new(move |envelope: Envelope<VolumeStatus>| {
        let sender = sender.clone();
        async move {
            sender
                .send(envelope.payload)
                .map_err(|e| HandlerError::failed(e.to_string()))
        }
    });
    (Arc::new(handler), receiver)
}

/// **VALUE**: A response is routed to the subscription registered under its id
/// with the payload decoded into the subscriber's type.
///
/// **BUG THIS CATCHES**: Lookups by the wrong key, or payloads handed over raw.
#[tokio::test]
async fn given_subscription_when_response_arrives_then_handler_gets_typed_payload() {
    // GIVEN: A subscription under a known id
    let client = offline_client();
    let (handler, mut received) = volume_recorder();
    client.track("5d3ed7900001", handler).await;

    // WHEN: A matching response is dispatched twice
    let raw = r#"{"id":"5d3ed7900001","type":"response","payload":{"volume":12}}"#;
    let first = client.dispatch(raw).await.unwrap();
    let second = client.dispatch(raw).await.unwrap();

    // THEN: Both are delivered and the subscription stays
    assert_eq!(first, Dispatch::Delivered);
    assert_eq!(second, Dispatch::Delivered);
    assert_eq!(received.recv().await, Some(Some(VolumeStatus { volume: 12 })));
    assert_eq!(received.recv().await, Some(Some(VolumeStatus { volume: 12 })));
    assert_eq!(client.pending().await, 1);
}

/// **VALUE**: Registration resets the session's correlation table.
///
/// **WHY THIS MATTERS**: Ids restart with every session, so a stale entry could
/// otherwise receive a response meant for a new request with the same id.
///
/// **BUG THIS CATCHES**: A table that survives `registered`, or a `registered`
/// envelope that forgets to report the key or move to Ready.
#[tokio::test]
async fn given_pending_entry_when_registered_then_table_cleared_and_key_published() {
    // GIVEN: A pending subscription and a key listener
    let client = offline_client();
    let (handler, mut received) = volume_recorder();
    client.track("5d3ed7900003", handler).await;

    let (key_sender, mut keys) = mpsc::unbounded_channel();
    let _keys = client.on_client_key_changed().subscribe(move |key| {
        let key_sender = key_sender.clone();
        async move {
            key_sender
                .send(key.expose().to_string())
                .map_err(|e| HandlerError::failed(e.to_string()))
        }
    });

    // WHEN: The device confirms the registration
    let registered = r#"{"id":"5d3ed7900000","type":"registered","payload":{"client-key":"f00d"}}"#;
    let outcome = client.dispatch(registered).await.unwrap();

    // THEN: Ready, key published, table empty
    assert_eq!(outcome, Dispatch::Registered);
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(keys.recv().await.as_deref(), Some("f00d"));
    assert_eq!(client.pending().await, 0);

    // AND: A late response for the old id reaches nobody
    let stale = r#"{"id":"5d3ed7900003","type":"response","payload":{"volume":3}}"#;
    let result = client.dispatch(stale).await;
    assert!(matches!(result, Err(ProtocolError::UnknownCorrelation { .. })));
    assert!(received.try_recv().is_err());
}

/// **VALUE**: A `registered` envelope without a usable key still ends the old
/// session and makes the client Ready.
///
/// **BUG THIS CATCHES**: A missing `client-key` aborting dispatch before the
/// table is cleared, leaving the client stuck in its previous state.
#[tokio::test]
async fn given_registered_without_client_key_when_dispatched_then_ready_and_no_key_published() {
    // GIVEN: A pending subscription and a key listener
    let client = offline_client();
    let (handler, _received) = volume_recorder();
    client.track("5d3ed7900003", handler).await;

    let (key_sender, mut keys) = mpsc::unbounded_channel::<String>();
    let _keys = client.on_client_key_changed().subscribe(move |key| {
        let key_sender = key_sender.clone();
        async move {
            key_sender
                .send(key.expose().to_string())
                .map_err(|e| HandlerError::failed(e.to_string()))
        }
    });

    // WHEN: The device registers with an empty payload, then with none at all
    let empty = r#"{"id":"5d3ed7900000","type":"registered","payload":{}}"#;
    let first = client.dispatch(empty).await.unwrap();
    let bare = r#"{"id":"5d3ed7900000","type":"registered"}"#;
    let second = client.dispatch(bare).await.unwrap();

    // THEN: Both count as registration, the table is empty and no key went out
    assert_eq!(first, Dispatch::Registered);
    assert_eq!(second, Dispatch::Registered);
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.pending().await, 0);
    assert!(keys.try_recv().is_err());
}

#[tokio::test]
async fn given_pairing_prompt_when_dispatched_then_state_is_pairing_and_table_untouched() {
    let client = offline_client();
    let (handler, _received) = volume_recorder();
    client.track("5d3ed7900001", handler).await;

    let prompt = r#"{"id":"5d3ed7900000","type":"response","payload":{"pairingType":"PROMPT","returnValue":true}}"#;
    let outcome = client.dispatch(prompt).await.unwrap();

    assert_eq!(outcome, Dispatch::PairingPrompt);
    assert_eq!(client.state(), ClientState::Pairing);
    assert_eq!(client.pending().await, 1);
}

#[tokio::test]
async fn given_blank_message_when_dispatched_then_ignored() {
    let client = offline_client();

    let outcome = client.dispatch("  \n").await.unwrap();

    assert_eq!(outcome, Dispatch::Ignored);
    assert_eq!(client.state(), ClientState::Disconnected);
}

#[tokio::test]
async fn given_malformed_json_when_dispatched_then_returns_json_error_without_state_change() {
    let client = offline_client();

    let result = client.dispatch("{not json").await;

    assert!(matches!(result, Err(ProtocolError::Json { .. })));
    assert_eq!(client.state(), ClientState::Disconnected);
}

/// **VALUE**: A handler failure is contained in its own dispatch.
///
/// **BUG THIS CATCHES**: Payload shape mismatches silently treated as success,
/// or error envelopes passed to the callback as if they were data.
#[tokio::test]
async fn given_wrong_shape_or_error_envelope_when_dispatched_then_handler_not_called() {
    // GIVEN: A subscription expecting a volume payload
    let client = offline_client();
    let (handler, mut received) = volume_recorder();
    client.track("5d3ed7900002", handler).await;

    // WHEN: The payload has another shape
    let wrong_shape = r#"{"id":"5d3ed7900002","type":"response","payload":{"muted":true}}"#;
    let shape = client.dispatch(wrong_shape).await;

    // AND: The device reports an error
    let remote = r#"{"id":"5d3ed7900002","type":"error","error":"404 no such service","payload":{}}"#;
    let error = client.dispatch(remote).await;

    // THEN: Both fail with their own error kind and the callback never ran
    assert!(matches!(shape, Err(ProtocolError::PayloadShape { .. })));
    match error {
        Err(ProtocolError::Remote { message, .. }) => assert_eq!(message, "404 no such service"),
        other => panic!("expected remote error, got {other:?}"),
    }
    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn given_one_shot_entry_when_response_arrives_then_entry_removes_itself() {
    // GIVEN: A one-shot entry wrapping a recorder, stored in its table
    let table = Arc::new(CorrelationTable::new());
    let (inner, mut received) = volume_recorder();
    let one_shot: Arc<dyn ResponseHandler> =
        Arc::new(OneShot::new("5d3ed7900004", Arc::downgrade(&table), inner));
    table
        .insert("5d3ed7900004".to_string(), Arc::clone(&one_shot))
        .await;

    // WHEN: The first response is handled
    let raw = r#"{"id":"5d3ed7900004","type":"response","payload":{"volume":7}}"#;
    one_shot.handle(raw).await.unwrap();

    // THEN: The entry is gone and the inner handler ran once
    assert!(table.get("5d3ed7900004").await.is_none());
    assert_eq!(received.recv().await, Some(Some(VolumeStatus { volume: 7 })));
}

#[tokio::test]
async fn given_completion_when_error_envelope_arrives_then_waiter_gets_remote_error() {
    let (sender, receiver) = oneshot::channel::<Result<VolumeStatus, ProtocolError>>();
    let completion = Completion::new(sender);

    let raw = r#"{"id":"5d3ed7900005","type":"error","error":"401 insufficient permissions"}"#;
    completion.handle(raw).await.unwrap();

    let outcome = receiver.await.unwrap();
    assert!(matches!(outcome, Err(ProtocolError::Remote { .. })));
}

#[tokio::test]
async fn given_completion_when_response_arrives_then_waiter_gets_payload() {
    let (sender, receiver) = oneshot::channel::<Result<VolumeStatus, ProtocolError>>();
    let completion = Completion::new(sender);

    let raw = r#"{"id":"5d3ed7900006","type":"response","payload":{"volume":30}}"#;
    completion.handle(raw).await.unwrap();

    assert_eq!(receiver.await.unwrap().unwrap(), VolumeStatus { volume: 30 });
}

#[tokio::test]
async fn given_offline_client_when_requesting_then_returns_not_ready() {
    let client = offline_client();

    let result = client
        .request("ssap://audio/getVolume", None::<()>, None)
        .await;

    assert!(matches!(result, Err(ProtocolError::NotReady { .. })));
}
