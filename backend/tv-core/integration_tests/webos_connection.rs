use crate::helpers::{FakeTv, Seen, StalledPeer, WAIT, eventually};

use tv_core::error::connection::ConnectionError;
use tv_core::events::Subscription;
use tv_core::webos::connection::SEND_TIMEOUT;
use tv_core::webos::{TransportState, WebOsConnection};

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn record_states(connection: &WebOsConnection) -> (Arc<Mutex<Vec<TransportState>>>, Subscription) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let subscription = connection.on_state_changed().subscribe(move |state| {
        sink.lock().unwrap().push(state);
        async { Ok(()) }
    });
    (states, subscription)
}

// ============================================
// STATE MACHINE
// ============================================

/// **VALUE**: Observers see every transport transition in order.
///
/// **BUG THIS CATCHES**: A supervisor that jumps straight from `Disconnected`
/// to `Connected` (or never republishes after a drop) leaves the client state
/// machine stuck.
#[tokio::test]
async fn given_dropped_socket_when_peer_returns_then_states_cycle_through_connecting() {
    // GIVEN a connection to a local fake TV
    let mut tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();
    let (states, _subscription) = record_states(&connection);

    // WHEN it starts and the first socket is dropped by the peer
    connection.start().await;
    assert_eq!(tv.expect_accepted().await, 1);
    eventually("first Connected", || states.lock().unwrap().len() == 2).await;

    tv.drop_connection();
    assert_eq!(tv.expect_closed().await, 1);
    assert_eq!(tv.expect_accepted().await, 2);
    eventually("reconnect", || states.lock().unwrap().len() == 5).await;

    // THEN Connecting sits between every Disconnected and Connected
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            TransportState::Connecting,
            TransportState::Connected,
            TransportState::Disconnected,
            TransportState::Connecting,
            TransportState::Connected,
        ]
    );

    connection.close().await;
}

#[tokio::test]
async fn given_unreachable_host_when_started_then_state_stays_out_of_connected() {
    // GIVEN a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let connection = WebOsConnection::new("127.0.0.1", port).unwrap();

    // WHEN the supervisor runs for a few retry rounds
    connection.start().await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    // THEN it keeps retrying without ever reporting Connected
    assert_ne!(connection.state(), TransportState::Connected);

    connection.close().await;
    assert_eq!(connection.state(), TransportState::Disconnected);
}

// ============================================
// SENDING AND RECEIVING
// ============================================

#[tokio::test]
async fn given_not_started_when_sending_then_not_ready() {
    let tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();

    let result = connection.send("hello", None).await;

    assert!(matches!(result, Err(ConnectionError::NotReady { .. })));
}

#[tokio::test]
async fn given_open_socket_when_messages_flow_then_both_directions_arrive() {
    // GIVEN an open connection with one message listener
    let mut tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();
    let (sender, mut received) = mpsc::unbounded_channel();
    let _subscription = connection.on_message().subscribe(move |text: String| {
        let _ = sender.send(text);
        async { Ok(()) }
    });

    connection.start().await;
    tv.expect_accepted().await;
    let mut state = connection.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == TransportState::Connected))
        .await
        .unwrap()
        .unwrap();

    // WHEN each side sends one message
    connection.send("ping", None).await.unwrap();
    tv.send("pong");

    // THEN both arrive unchanged
    assert_eq!(tv.next_seen().await, Seen::Text("ping".to_string()));
    let inbound = tokio::time::timeout(WAIT, received.recv()).await.unwrap();
    assert_eq!(inbound.as_deref(), Some("pong"));

    connection.close().await;
}

// ============================================
// DEVICE SENTINELS
// ============================================

/// **VALUE**: The pairing rate-limit reply makes the client back off instead
/// of hammering the TV.
///
/// **WHY THIS MATTERS**: The TV keeps rejecting pairing while requests keep
/// coming; reconnecting immediately never lets the limit expire.
#[tokio::test]
async fn given_rate_limit_sentinel_when_received_then_reconnects_after_delay_without_forwarding() {
    // GIVEN an open connection with one message listener
    let mut tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();
    let (sender, mut received) = mpsc::unbounded_channel();
    let _subscription = connection.on_message().subscribe(move |text: String| {
        let _ = sender.send(text);
        async { Ok(()) }
    });
    connection.start().await;
    tv.expect_accepted().await;
    let mut state = connection.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == TransportState::Connected))
        .await
        .unwrap()
        .unwrap();

    // WHEN the TV reports too many pairing requests
    tv.send("403 Too Many Pairing Requests");

    // THEN the socket is closed and reopened only after the delay
    tv.expect_closed().await;
    let closed_at = Instant::now();
    tv.expect_accepted().await;
    assert!(closed_at.elapsed() >= Duration::from_millis(2_800));

    // AND the sentinel never reached the listener
    assert!(received.try_recv().is_err());

    connection.close().await;
}

/// **VALUE**: The power-state refusal gets its own short back-off.
///
/// **BUG THIS CATCHES**: The refusal forwarded to listeners as a response, or
/// handled with the long rate-limit delay (or none at all).
#[tokio::test]
async fn given_power_state_sentinel_when_received_then_reconnects_after_short_delay_without_forwarding() {
    // GIVEN an open connection with one message listener
    let mut tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();
    let (sender, mut received) = mpsc::unbounded_channel();
    let _subscription = connection.on_message().subscribe(move |text: String| {
        let _ = sender.send(text);
        async { Ok(()) }
    });
    connection.start().await;
    tv.expect_accepted().await;
    let mut state = connection.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == TransportState::Connected))
        .await
        .unwrap()
        .unwrap();

    // WHEN the TV refuses because of its power state
    tv.send("403 Error!! power state");

    // THEN the socket is closed and reopened after about one second
    tv.expect_closed().await;
    let closed_at = Instant::now();
    tv.expect_accepted().await;
    let waited = closed_at.elapsed();
    assert!(waited >= Duration::from_millis(800), "reconnected after {waited:?}");
    assert!(waited < Duration::from_millis(2_500), "reconnected after {waited:?}");

    // AND the sentinel never reached the listener
    assert!(received.try_recv().is_err());

    connection.close().await;
}

#[tokio::test]
async fn given_closed_connection_when_started_again_then_it_stays_disconnected() {
    // GIVEN a connection that was opened and closed
    let mut tv = FakeTv::start().await;
    let connection = WebOsConnection::new("127.0.0.1", tv.port).unwrap();
    connection.start().await;
    tv.expect_accepted().await;
    connection.close().await;
    tv.expect_closed().await;

    // WHEN start is called again
    connection.start().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // THEN nothing reconnects
    assert_eq!(connection.state(), TransportState::Disconnected);
}

// ============================================
// SEND DEADLINES
// ============================================

/// Open a connection to a peer that never reads.
async fn stalled_connection() -> WebOsConnection {
    let peer = StalledPeer::start().await;
    let connection = WebOsConnection::new("127.0.0.1", peer.port).unwrap();
    connection.start().await;
    let mut state = connection.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == TransportState::Connected))
        .await
        .unwrap()
        .unwrap();
    connection
}

/// **VALUE**: A caller giving up is reported as a cancellation, not as a
/// device that stopped responding.
///
/// **BUG THIS CATCHES**: The caller's token and the internal write deadline
/// mapped to the same error, or the token ignored until the deadline fires.
#[tokio::test]
async fn given_stalled_write_when_caller_cancels_then_cancelled_before_deadline() {
    // GIVEN a peer that stops reading and a token cancelled shortly
    let connection = stalled_connection().await;
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    // WHEN large messages are written until one fails
    let chunk = "x".repeat(1 << 20);
    let started = Instant::now();
    let mut failure = None;
    for _ in 0..1024 {
        if let Err(e) = connection.send(&chunk, Some(&token)).await {
            failure = Some(e);
            break;
        }
    }

    // THEN the failure is the cancellation, well before the write deadline
    let failure = failure.expect("Writes never backed up");
    assert!(matches!(failure, ConnectionError::Cancelled { .. }), "got {failure:?}");
    assert!(started.elapsed() < SEND_TIMEOUT);

    // Dropping stops the supervisor without a close frame the peer would never read
    drop(connection);
}

#[tokio::test]
async fn given_stalled_write_without_token_when_deadline_passes_then_send_timeout() {
    // GIVEN a peer that stops reading
    let connection = stalled_connection().await;

    // WHEN large messages are written until one fails
    let chunk = "x".repeat(1 << 20);
    let mut failure = None;
    let mut last_started = Instant::now();
    for _ in 0..1024 {
        last_started = Instant::now();
        if let Err(e) = connection.send(&chunk, None).await {
            failure = Some(e);
            break;
        }
    }

    // THEN the write that blocked ran into the internal deadline
    let failure = failure.expect("Writes never backed up");
    assert!(matches!(failure, ConnectionError::SendTimeout { .. }), "got {failure:?}");
    assert!(last_started.elapsed() >= SEND_TIMEOUT - Duration::from_millis(100));

    drop(connection);
}
