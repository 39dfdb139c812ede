use crate::helpers::LinePeer;

use tv_core::error::rs232::Rs232Error;
use tv_core::rs232::{Rs232Client, Rs232Command};

use std::net::{Ipv4Addr, SocketAddr};

#[tokio::test]
async fn given_connected_client_when_commands_sent_then_lines_end_with_crlf() {
    // GIVEN a client connected to a line-reading peer
    let mut peer = LinePeer::start().await;
    let mut client = Rs232Client::new(SocketAddr::from((Ipv4Addr::LOCALHOST, peer.port)));
    client.connect(None).await.unwrap();

    // WHEN two commands are sent
    client.send_command(Rs232Command::Down).await.unwrap();
    client.send_command(Rs232Command::Enter).await.unwrap();

    // THEN each arrives as its own CR LF terminated line
    assert_eq!(peer.next_line().await.0, "mc 1 41\r\n");
    assert_eq!(peer.next_line().await.0, "mc 1 44\r\n");

    client.close().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn given_no_connection_when_sending_then_not_connected() {
    let peer = LinePeer::start().await;
    let mut client = Rs232Client::new(SocketAddr::from((Ipv4Addr::LOCALHOST, peer.port)));

    let result = client.send_raw("mc 1 00").await;

    assert!(matches!(result, Err(Rs232Error::NotConnected { .. })));
}
