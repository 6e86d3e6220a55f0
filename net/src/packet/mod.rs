// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet struct and methods

mod meta;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

use crate::eth::Eth;
use crate::flow::FlowKey;
use crate::ipv4::Ipv4;
use crate::parse::ParseError;
use crate::transport::Transport;
use etherparse::{EtherType, Ethernet2Header, Ipv4Header};
use tracing::trace;

#[allow(unused_imports)] // re-export
pub use meta::*;

/// A parsed ethernet frame carrying IPv4.
#[derive(Debug, Clone)]
pub struct Packet {
    eth: Eth,
    ipv4: Ipv4,
    transport: Option<Transport>,
    payload: Vec<u8>,
    wire_len: usize,
    /// packet metadata added by stages to drive other stages down the pipeline
    pub meta: PacketMeta,
}

impl Packet {
    /// Parse a frame. Transport headers other than TCP or UDP, as well as truncated
    /// ones, are kept as opaque payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the frame is not ethernet carrying a valid IPv4 header.
    pub fn parse(frame: &[u8]) -> Result<Packet, ParseError> {
        let (eth, rest) =
            Ethernet2Header::from_slice(frame).map_err(|_| ParseError::TruncatedEth(frame.len()))?;
        if eth.ether_type != EtherType::IPV4 {
            return Err(ParseError::NotIpv4(eth.ether_type.0));
        }
        let (ip, rest) =
            Ipv4Header::from_slice(rest).map_err(|e| ParseError::InvalidIpv4(e.to_string()))?;
        let ipv4 = Ipv4::from_header(ip);

        let (transport, rest) = if ipv4.is_trailing_fragment() {
            (None, rest)
        } else {
            match Transport::parse(ipv4.protocol(), rest) {
                Some((transport, rest)) => (Some(transport), rest),
                None => (None, rest),
            }
        };
        trace!(
            "Parsed {} -> {} proto {} ({} bytes)",
            ipv4.source(),
            ipv4.destination(),
            ipv4.protocol(),
            frame.len()
        );
        Ok(Packet {
            eth: Eth::from_header(eth),
            ipv4,
            transport,
            payload: rest.to_vec(),
            wire_len: frame.len(),
            meta: PacketMeta::default(),
        })
    }

    /// Write the (possibly modified) headers followed by the payload.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len);
        out.extend_from_slice(&self.eth.to_bytes());
        self.ipv4.extend_bytes(&mut out);
        if let Some(transport) = &self.transport {
            transport.extend_bytes(&mut out);
        }
        out.extend_from_slice(&self.payload);
        out
    }

    /// The flow identifier of this packet
    #[must_use]
    pub fn flow_key(&self) -> FlowKey {
        let (src_port, dst_port) = self
            .transport
            .as_ref()
            .map_or((0, 0), |t| (t.src_port(), t.dst_port()));
        FlowKey::new(
            self.ipv4.source(),
            self.ipv4.destination(),
            self.ipv4.protocol(),
            src_port,
            dst_port,
        )
    }

    /// Length of the frame as received, which is what load counters account
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    #[must_use]
    pub fn eth(&self) -> &Eth {
        &self.eth
    }

    pub fn eth_mut(&mut self) -> &mut Eth {
        &mut self.eth
    }

    #[must_use]
    pub fn ipv4(&self) -> &Ipv4 {
        &self.ipv4
    }

    pub fn ipv4_mut(&mut self) -> &mut Ipv4 {
        &mut self.ipv4
    }

    #[must_use]
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Packet {
    /// Explicitly mark a packet as done, indicating the reason. Broadly, there are 2 types of reasons
    ///  - The packet is to be dropped due to the indicated reason.
    ///  - The packet has been processed and is marked as done to prevent later stages from processing it.
    ///
    /// The first reason sticks: later calls do not override it.
    pub fn done(&mut self, reason: DoneReason) {
        if self.meta.done.is_none() {
            self.meta.done = Some(reason);
        }
    }

    /// This behaves like the `done()` method but overwrites the reason.
    pub fn done_force(&mut self, reason: DoneReason) {
        self.meta.done = Some(reason);
    }

    /// Tell if a packet has been marked as done.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.meta.done.is_some()
    }

    /// Get the reason why a packet has been marked as done.
    #[must_use]
    pub fn get_done(&self) -> Option<DoneReason> {
        self.meta.done
    }

    /// Get an immutable reference to the metadata of this `Packet`
    #[must_use]
    pub fn get_meta(&self) -> &PacketMeta {
        &self.meta
    }

    /// Get a mutable reference to the metadata of this `Packet`
    pub fn get_meta_mut(&mut self) -> &mut PacketMeta {
        &mut self.meta
    }

    /// Wraps a packet in an `Option` depending on the metadata:
    /// If [`Packet`] is to be dropped, returns `None`. Else, `Some`.
    #[must_use]
    pub fn enforce(self) -> Option<Self> {
        if self.meta.keep() {
            // keep packets even if they should be dropped
            return Some(self);
        }
        match self.get_done() {
            Some(DoneReason::Delivered) | None => Some(self),
            Some(_) => None,
        }
    }
}
