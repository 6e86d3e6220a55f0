// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet types

pub mod mac;

use crate::eth::mac::Mac;
use etherparse::{EtherType, Ethernet2Header};

/// An ethernet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eth(Ethernet2Header);

impl Eth {
    /// The length (in bytes) of an [`Eth`] header
    pub const HEADER_LEN: usize = Ethernet2Header::LEN;

    /// Create a new [`Eth`] header carrying IPv4
    #[must_use]
    pub fn new(source: Mac, destination: Mac) -> Eth {
        Eth(Ethernet2Header {
            source: source.0,
            destination: destination.0,
            ether_type: EtherType::IPV4,
        })
    }

    pub(crate) fn from_header(header: Ethernet2Header) -> Eth {
        Eth(header)
    }

    #[must_use]
    pub fn source(&self) -> Mac {
        Mac(self.0.source)
    }

    #[must_use]
    pub fn destination(&self) -> Mac {
        Mac(self.0.destination)
    }

    #[must_use]
    pub fn ether_type(&self) -> u16 {
        self.0.ether_type.0
    }

    pub fn set_source(&mut self, source: Mac) -> &mut Eth {
        self.0.source = source.0;
        self
    }

    pub fn set_destination(&mut self, destination: Mac) -> &mut Eth {
        self.0.destination = destination.0;
        self
    }

    pub(crate) fn to_bytes(&self) -> [u8; Ethernet2Header::LEN] {
        self.0.to_bytes()
    }
}
