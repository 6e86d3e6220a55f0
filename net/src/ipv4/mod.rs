// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ipv4 header type and logic.

use etherparse::Ipv4Header;
use std::net::Ipv4Addr;

/// An IPv4 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4(Ipv4Header);

impl Ipv4 {
    pub(crate) fn from_header(header: Ipv4Header) -> Ipv4 {
        Ipv4(header)
    }

    #[must_use]
    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.source)
    }

    #[must_use]
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.destination)
    }

    /// The protocol number of the next header
    #[must_use]
    pub fn protocol(&self) -> u8 {
        self.0.protocol.0
    }

    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.0.time_to_live
    }

    /// Set the ttl and refresh the header checksum.
    pub fn set_ttl(&mut self, ttl: u8) -> &mut Ipv4 {
        self.0.time_to_live = ttl;
        self.update_checksum();
        self
    }

    /// Decrement the ttl. Returns the new value, or `None` (leaving the header untouched)
    /// if the ttl would reach zero.
    pub fn decrement_ttl(&mut self) -> Option<u8> {
        match self.0.time_to_live {
            0 | 1 => None,
            ttl => {
                self.set_ttl(ttl - 1);
                Some(ttl - 1)
            }
        }
    }

    /// True if this header describes a non-first fragment, which carries no transport header.
    #[must_use]
    pub fn is_trailing_fragment(&self) -> bool {
        self.0.fragment_offset.value() != 0
    }

    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Length of the payload as claimed by the header
    #[must_use]
    pub fn payload_len(&self) -> usize {
        usize::from(self.0.total_len).saturating_sub(self.header_len())
    }

    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        self.0.header_checksum == self.0.calc_header_checksum()
    }

    fn update_checksum(&mut self) {
        self.0.header_checksum = self.0.calc_header_checksum();
    }

    pub(crate) fn extend_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_bytes());
    }
}
