// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc
)]

//! Frame builders for tests

use crate::eth::mac::Mac;
use etherparse::{IpNumber, Ipv4Header, PacketBuilder};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Source mac of built frames
pub const TEST_SRC_MAC: Mac = Mac([0x02, 0, 0, 0, 0, 0x01]);
/// Destination mac of built frames
pub const TEST_DST_MAC: Mac = Mac([0x02, 0, 0, 0, 0, 0x02]);
/// TTL of built frames
pub const TEST_TTL: u8 = 64;

#[must_use]
/// Build an Ipv4 address from a &str
pub fn addr_v4(a: &str) -> Ipv4Addr {
    Ipv4Addr::from_str(a).expect("Bad IPv4 address")
}

#[must_use]
/// Builds a UDP/IPv4/Eth frame with `payload_len` zero bytes of payload
pub fn udp_frame(src: &str, dst: &str, sport: u16, dport: u16, payload_len: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(TEST_SRC_MAC.0, TEST_DST_MAC.0)
        .ipv4(addr_v4(src).octets(), addr_v4(dst).octets(), TEST_TTL)
        .udp(sport, dport);
    let payload = vec![0u8; payload_len];
    let mut out = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut out, &payload).expect("Failed to build frame");
    out
}

#[must_use]
/// Builds a TCP/IPv4/Eth frame with `payload_len` zero bytes of payload
pub fn tcp_frame(src: &str, dst: &str, sport: u16, dport: u16, payload_len: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(TEST_SRC_MAC.0, TEST_DST_MAC.0)
        .ipv4(addr_v4(src).octets(), addr_v4(dst).octets(), TEST_TTL)
        .tcp(sport, dport, 1, 65535);
    let payload = vec![0u8; payload_len];
    let mut out = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut out, &payload).expect("Failed to build frame");
    out
}

#[must_use]
/// Builds an IPv4/Eth frame carrying an opaque payload with the given protocol number
pub fn unknown_transport_frame(src: &str, dst: &str, protocol: u8, payload_len: usize) -> Vec<u8> {
    let mut out = udp_frame(src, dst, 0, 0, payload_len.saturating_sub(8));
    let (mut ip, _) = Ipv4Header::from_slice(&out[14..]).expect("Bad IPv4 header");
    ip.protocol = IpNumber(protocol);
    ip.header_checksum = ip.calc_header_checksum();
    let bytes = ip.to_bytes();
    out[14..14 + bytes.len()].copy_from_slice(&bytes);
    out
}
