use crate::error::tv::TvError;
use crate::tv::wake::{MAGIC_PACKET_LENGTH, magic_packet, parse_mac};

#[test]
fn given_colon_and_dash_separated_mac_when_parsing_then_bytes_match() {
    let expected = [0xa4, 0x36, 0xc7, 0x01, 0xfe, 0x0b];

    assert_eq!(parse_mac("a4:36:c7:01:fe:0b").unwrap(), expected);
    assert_eq!(parse_mac("A4-36-C7-01-FE-0B").unwrap(), expected);
}

#[test]
fn given_malformed_mac_when_parsing_then_returns_invalid_mac_error() {
    for mac in ["", "a4:36:c7:01:fe", "a4:36:c7:01:fe:0b:00", "a4:36:c7:01:fe:zz", "a4:36:c7:1:fe:0b", "+4:36:c7:01:fe:0b"] {
        assert!(
            matches!(parse_mac(mac), Err(TvError::InvalidMacAddress { .. })),
            "{mac:?} should be rejected"
        );
    }
}

/// **VALUE**: Packet layout the network card listens for.
///
/// **BUG THIS CATCHES**: 15 or 17 MAC repetitions, or a missing sync stream.
#[test]
fn given_mac_when_building_magic_packet_then_sync_stream_and_16_repetitions() {
    let mac = [1, 2, 3, 4, 5, 6];

    let packet = magic_packet(mac);

    assert_eq!(packet.len(), MAGIC_PACKET_LENGTH);
    assert_eq!(MAGIC_PACKET_LENGTH, 102);
    assert!(packet[..6].iter().all(|&b| b == 0xFF));
    assert!(packet[6..].chunks(6).all(|chunk| chunk == mac));
    assert_eq!(packet[6..].chunks(6).count(), 16);
}
