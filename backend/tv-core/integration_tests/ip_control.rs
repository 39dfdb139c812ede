use crate::helpers::WAIT;

use tv_core::error::ip_control::IpControlError;
use tv_core::ip_control::{IpControlClient, IpControlInput, IpControlKey, MessageCipher};

use common::RedactedSecret;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const KEYCODE: &str = "ABC12345";

/// One-connection TV stand-in: decodes every frame with the shared keycode,
/// reports the command text and answers `OK` to each.
async fn start_ip_control_tv() -> (std::net::SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (sender, commands) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let cipher = MessageCipher::new(KEYCODE);
        let mut buffer = [0u8; 1024];

        loop {
            let read = match stream.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(read) => read,
            };
            let command = cipher.decode(&buffer[..read]).unwrap();
            let _ = sender.send(command);
            if stream.write_all(&cipher.encode("OK")).await.is_err() {
                break;
            }
        }
    });

    (address, commands)
}

async fn connected_client(address: std::net::SocketAddr) -> IpControlClient {
    let mut client = IpControlClient::new(address, &RedactedSecret::new(KEYCODE));
    client.connect(None).await.unwrap();
    client
}

#[tokio::test]
async fn given_no_connection_when_sending_then_not_connected() {
    let (address, _commands) = start_ip_control_tv().await;
    let mut client = IpControlClient::new(address, &RedactedSecret::new(KEYCODE));

    let result = client.send_key(IpControlKey::Ok).await;

    assert!(matches!(result, Err(IpControlError::NotConnected { .. })));
    assert!(!client.is_connected());
}

/// **VALUE**: Frames produced by the client decode on the TV side with the
/// same keycode, and the TV's reply decodes on ours.
///
/// **BUG THIS CATCHES**: Key derivation or IV handling drifting between
/// encode and decode; the TV silently ignores frames it cannot decrypt.
#[tokio::test]
async fn given_connected_client_when_key_sent_then_tv_decodes_command_and_reply_decodes() {
    // GIVEN a client connected to the fake TV
    let (address, mut commands) = start_ip_control_tv().await;
    let mut client = connected_client(address).await;

    // WHEN a key press is sent
    client.send_key(IpControlKey::ArrowDown).await.unwrap();

    // THEN the TV reads the plain command
    let command = tokio::time::timeout(WAIT, commands.recv()).await.unwrap();
    assert_eq!(command.as_deref(), Some("KEY_ACTION arrowdown"));

    // AND the reply comes back readable
    assert_eq!(client.receive(None).await.unwrap(), "OK");

    client.close().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn given_connected_client_when_typed_commands_sent_then_wire_text_matches() {
    let (address, mut commands) = start_ip_control_tv().await;
    let mut client = connected_client(address).await;

    client.switch_input(IpControlInput::Hdmi2).await.unwrap();
    client.receive(None).await.unwrap();
    client.request_mac_address("wired").await.unwrap();
    client.receive(None).await.unwrap();
    client.request_current_volume().await.unwrap();
    client.receive(None).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(tokio::time::timeout(WAIT, commands.recv()).await.unwrap().unwrap());
    }
    assert_eq!(seen, ["INPUT_SELECT hdmi2", "GET_MACADDRESS wired", "CURRENT_VOL"]);

    client.close().await;
}

#[tokio::test]
async fn given_peer_closes_when_receiving_then_closed() {
    // GIVEN a TV that hangs up right after accepting
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _): (TcpStream, _) = listener.accept().await.unwrap();
        drop(stream);
    });
    let mut client = connected_client(address).await;

    // WHEN a reply is awaited
    let result = client.receive(None).await;

    // THEN the client reports the closed channel
    assert!(matches!(result, Err(IpControlError::Closed { .. })));
}
