// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Transport headers the forwarding logic understands

use etherparse::{IpNumber, TcpHeader, UdpHeader};

/// A parsed transport header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

impl Transport {
    pub(crate) fn parse(protocol: u8, buf: &[u8]) -> Option<(Transport, &[u8])> {
        match IpNumber(protocol) {
            IpNumber::TCP => TcpHeader::from_slice(buf)
                .ok()
                .map(|(tcp, rest)| (Transport::Tcp(tcp), rest)),
            IpNumber::UDP => UdpHeader::from_slice(buf)
                .ok()
                .map(|(udp, rest)| (Transport::Udp(udp), rest)),
            _ => None,
        }
    }

    #[must_use]
    pub fn src_port(&self) -> u16 {
        match self {
            Transport::Tcp(tcp) => tcp.source_port,
            Transport::Udp(udp) => udp.source_port,
        }
    }

    #[must_use]
    pub fn dst_port(&self) -> u16 {
        match self {
            Transport::Tcp(tcp) => tcp.destination_port,
            Transport::Udp(udp) => udp.destination_port,
        }
    }

    pub(crate) fn extend_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Transport::Tcp(tcp) => out.extend_from_slice(&tcp.to_bytes()),
            Transport::Udp(udp) => out.extend_from_slice(&udp.to_bytes()),
        }
    }
}
