// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow identifier used to spread traffic over equal-cost paths

use std::fmt::Display;
use std::net::Ipv4Addr;

/// The 5-tuple of a packet. Packets without a recognized transport header
/// carry zero in both port fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub proto: u8,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub const WIRE_LEN: usize = 13;

    #[must_use]
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, proto: u8, src_port: u16, dst_port: u16) -> Self {
        Self {
            src,
            dst,
            proto,
            src_port,
            dst_port,
        }
    }

    /// Fixed network-order encoding, the input of flow hashing
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[0..4].copy_from_slice(&self.src.octets());
        out[4..8].copy_from_slice(&self.dst.octets());
        out[8] = self.proto;
        out[9..11].copy_from_slice(&self.src_port.to_be_bytes());
        out[11..13].copy_from_slice(&self.dst_port.to_be_bytes());
        out
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} proto {}",
            self.src, self.src_port, self.dst, self.dst_port, self.proto
        )
    }
}
