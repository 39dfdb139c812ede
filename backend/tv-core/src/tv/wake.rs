//! Wake-on-LAN magic packets.

use crate::error::tv::TvError;

use common::ErrorLocation;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::panic::Location;

use log::info;
use tokio::net::UdpSocket;

pub const WAKE_ON_LAN_PORT: u16 = 9;

const MAC_LENGTH: usize = 6;
const SYNC_STREAM: [u8; MAC_LENGTH] = [0xFF; MAC_LENGTH];
const MAC_REPETITIONS: usize = 16;

/// 6 x `0xFF` followed by the MAC 16 times.
pub const MAGIC_PACKET_LENGTH: usize = MAC_LENGTH * (1 + MAC_REPETITIONS);

/// Parse `aa:bb:cc:dd:ee:ff` (`-` separators are accepted too).
pub fn parse_mac(mac: &str) -> Result<[u8; MAC_LENGTH], TvError> {
    let invalid = |reason: &str| TvError::InvalidMacAddress {
        message: format!("{mac:?}: {reason}"),
        location: ErrorLocation::from(Location::caller()),
    };

    let parts: Vec<&str> = mac.split([':', '-']).collect();
    if parts.len() != MAC_LENGTH {
        return Err(invalid("expected six hex octets"));
    }

    let mut bytes = [0u8; MAC_LENGTH];
    for (byte, part) in bytes.iter_mut().zip(parts) {
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("every octet needs two hex digits"));
        }
        *byte = u8::from_str_radix(part, 16).map_err(|_| invalid("octet is not hex"))?;
    }
    Ok(bytes)
}

pub fn magic_packet(mac: [u8; MAC_LENGTH]) -> [u8; MAGIC_PACKET_LENGTH] {
    let mut packet = [0u8; MAGIC_PACKET_LENGTH];
    packet[..MAC_LENGTH].copy_from_slice(&SYNC_STREAM);
    for chunk in packet[MAC_LENGTH..].chunks_exact_mut(MAC_LENGTH) {
        chunk.copy_from_slice(&mac);
    }
    packet
}

/// Send the magic packet for `mac` to `target:9` with broadcast enabled.
pub async fn send_magic_packet(target: IpAddr, mac: &str) -> Result<(), TvError> {
    let packet = magic_packet(parse_mac(mac)?);

    let bind: SocketAddr = match target {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(bind).await?;
    socket.set_broadcast(true)?;
    socket
        .send_to(&packet, SocketAddr::new(target, WAKE_ON_LAN_PORT))
        .await?;

    info!("Wake-on-LAN packet sent to {target} for {mac}");
    Ok(())
}
