// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type to represent IPv4 network prefixes.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
pub use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefixError {
    #[error("Invalid Prefix: {0}")]
    Invalid(String),
    #[error("Mask length {0} is invalid")]
    InvalidLength(u8),
}

/// An IPv4 prefix. Host bits are always cleared, so `10.0.1.7/24` and `10.0.1.0/24`
/// are the same prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Ipv4Prefix(Ipv4Net);

impl Ipv4Prefix {
    pub const MAX_LEN: u8 = 32;
    pub const ROOT: Ipv4Prefix = Ipv4Prefix(Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0));

    /// Build a prefix from an address and a mask length.
    ///
    /// # Errors
    ///
    /// Fails if `len` is larger than 32.
    pub fn new(addr: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        Ipv4Net::new(addr, len)
            .map(|net| Self(net.trunc()))
            .map_err(|_| PrefixError::InvalidLength(len))
    }

    /// Build the /32 prefix of a single address
    #[must_use]
    pub fn host(addr: Ipv4Addr) -> Self {
        Self(Ipv4Net::new_assert(addr, Self::MAX_LEN))
    }

    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.0.prefix_len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.len() == Self::MAX_LEN
    }

    /// Check whether prefix covers a given address
    #[must_use]
    pub fn covers_addr(&self, addr: &Ipv4Addr) -> bool {
        self.0.contains(addr)
    }

    /// Check whether prefix covers another prefix
    #[must_use]
    pub fn covers(&self, other: &Ipv4Prefix) -> bool {
        self.0.contains(&other.0)
    }
}

impl From<Ipv4Net> for Ipv4Prefix {
    fn from(value: Ipv4Net) -> Self {
        Self(value.trunc())
    }
}

impl From<Ipv4Prefix> for Ipv4Net {
    fn from(value: Ipv4Prefix) -> Self {
        value.0
    }
}

impl From<Ipv4Addr> for Ipv4Prefix {
    fn from(addr: Ipv4Addr) -> Self {
        Self::host(addr)
    }
}

impl TryFrom<(&str, u8)> for Ipv4Prefix {
    type Error = PrefixError;

    fn try_from((addr_str, mask_len): (&str, u8)) -> Result<Self, Self::Error> {
        let addr = Ipv4Addr::from_str(addr_str)
            .map_err(|_| PrefixError::Invalid(format!("{addr_str}/{mask_len}")))?;
        Self::new(addr, mask_len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = PrefixError;

    /// Accepts `a.b.c.d/len`, or a bare address meaning a /32
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, len)) => {
                let len = len
                    .parse::<u8>()
                    .map_err(|_| PrefixError::Invalid(s.to_owned()))?;
                Self::try_from((addr, len))
            }
            None => Ipv4Addr::from_str(s)
                .map(Self::host)
                .map_err(|_| PrefixError::Invalid(s.to_owned())),
        }
    }
}

impl Display for Ipv4Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Ipv4Prefix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Prefix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4Prefix::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(any(test, feature = "testing"))]
mod contract {
    use super::Ipv4Prefix;
    use bolero::{Driver, TypeGenerator};
    use std::net::Ipv4Addr;

    impl TypeGenerator for Ipv4Prefix {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let addr = Ipv4Addr::from_bits(driver.produce::<u32>()?);
            let len = driver.produce::<u8>()? % (Ipv4Prefix::MAX_LEN + 1);
            Ipv4Prefix::new(addr, len).ok()
        }
    }
}
