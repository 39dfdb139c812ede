//! Local stand-ins for the TV used by the integration tests.
//!
//! - [`FakeTv`]: WebSocket peer on an ephemeral port that records what the
//!   client sends and lets the test push messages back
//! - [`LinePeer`]: TCP peer that records CR LF terminated lines with arrival times
//! - [`StalledPeer`]: WebSocket peer that completes the handshake and never reads

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Default wait for anything the tests expect to happen.
pub const WAIT: Duration = Duration::from_secs(5);

/// What the fake TV observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Accepted(usize),
    Text(String),
    Closed(usize),
}

enum Command {
    Send(String),
    Drop,
}

type CommandSender = mpsc::UnboundedSender<Command>;

pub struct FakeTv {
    pub port: u16,
    seen: mpsc::UnboundedReceiver<Seen>,
    current: Arc<Mutex<Option<CommandSender>>>,
}

impl FakeTv {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake TV");
        let port = listener.local_addr().expect("No local address").port();

        let (seen_sender, seen) = mpsc::unbounded_channel();
        let current: Arc<Mutex<Option<CommandSender>>> = Arc::new(Mutex::new(None));

        let current_for_loop = Arc::clone(&current);
        tokio::spawn(async move {
            let mut accepted = 0usize;
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                accepted += 1;
                let number = accepted;

                let (command_sender, mut commands) = mpsc::unbounded_channel();
                *current_for_loop.lock().unwrap() = Some(command_sender);
                let _ = seen_sender.send(Seen::Accepted(number));

                let seen_sender = seen_sender.clone();
                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            inbound = read.next() => match inbound {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = seen_sender.send(Seen::Text(text.as_str().to_owned()));
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                            command = commands.recv() => match command {
                                Some(Command::Send(text)) => {
                                    if write.send(Message::text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                Some(Command::Drop) | None => break,
                            },
                        }
                    }
                    let _ = seen_sender.send(Seen::Closed(number));
                });
            }
        });

        Self { port, seen, current }
    }

    /// Push a text message on the most recent connection.
    pub fn send(&self, text: impl Into<String>) {
        let current = self.current.lock().unwrap();
        current
            .as_ref()
            .expect("No connection to send on")
            .send(Command::Send(text.into()))
            .expect("Connection task ended");
    }

    /// Drop the most recent connection without a close handshake.
    pub fn drop_connection(&self) {
        if let Some(sender) = self.current.lock().unwrap().take() {
            let _ = sender.send(Command::Drop);
        }
    }

    pub async fn next_seen(&mut self) -> Seen {
        tokio::time::timeout(WAIT, self.seen.recv())
            .await
            .expect("Fake TV saw nothing in time")
            .expect("Fake TV stopped")
    }

    pub async fn expect_accepted(&mut self) -> usize {
        match self.next_seen().await {
            Seen::Accepted(number) => number,
            other => panic!("Expected a new connection, got {other:?}"),
        }
    }

    pub async fn expect_closed(&mut self) -> usize {
        match self.next_seen().await {
            Seen::Closed(number) => number,
            other => panic!("Expected the connection to close, got {other:?}"),
        }
    }

    /// Next text message, parsed as JSON.
    pub async fn expect_json(&mut self) -> Value {
        loop {
            match self.next_seen().await {
                Seen::Text(text) => {
                    return serde_json::from_str(&text).expect("Client sent invalid JSON");
                }
                Seen::Accepted(_) => continue,
                other => panic!("Expected a text message, got {other:?}"),
            }
        }
    }
}

/// TCP peer recording CR LF terminated lines with their arrival time.
pub struct LinePeer {
    pub port: u16,
    lines: mpsc::UnboundedReceiver<(String, Instant)>,
}

impl LinePeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind line peer");
        let port = listener.local_addr().expect("No local address").port();
        let (sender, lines) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let sender = sender.clone();
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream);
                    let mut line = String::new();
                    while let Ok(read) = reader.read_line(&mut line).await {
                        if read == 0 {
                            break;
                        }
                        let _ = sender.send((line.clone(), Instant::now()));
                        line.clear();
                    }
                });
            }
        });

        Self { port, lines }
    }

    pub async fn next_line(&mut self) -> (String, Instant) {
        tokio::time::timeout(WAIT, self.lines.recv())
            .await
            .expect("No line in time")
            .expect("Line peer stopped")
    }
}

/// WebSocket peer that accepts connections and then never reads from them,
/// so the client's writes back up once the socket buffers are full.
pub struct StalledPeer {
    pub port: u16,
}

impl StalledPeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stalled peer");
        let port = listener.local_addr().expect("No local address").port();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let _held = ws;
                    std::future::pending::<()>().await;
                });
            }
        });

        Self { port }
    }
}

/// What the device answers a `register` without a known key.
pub fn pairing_prompt(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","type":"response","payload":{{"pairingType":"PROMPT","returnValue":true}}}}"#
    )
}

pub fn registered(id: &str, client_key: &str) -> String {
    format!(r#"{{"id":"{id}","type":"registered","payload":{{"client-key":"{client_key}"}}}}"#)
}

pub fn response(id: &str, payload: Value) -> String {
    serde_json::json!({ "id": id, "type": "response", "payload": payload }).to_string()
}

pub fn id_of(envelope: &Value) -> String {
    envelope["id"]
        .as_str()
        .expect("Envelope without an id")
        .to_string()
}

/// Poll `condition` until it holds or [`WAIT`] runs out.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
