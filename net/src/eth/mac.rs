// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mac address type and logic.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A [MAC Address] type.
///
/// `Mac` is a transparent wrapper around `[u8; 6]` which provides a
/// small collection of methods and type safety. It (de)serializes as the usual
/// colon-separated string.
///
/// [MAC Address]: https://en.wikipedia.org/wiki/MAC_address
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Mac(pub [u8; 6]);

impl Mac {
    pub const ZERO: Mac = Mac([0; 6]);
    pub const BROADCAST: Mac = Mac([0xff; 6]);

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Mac::ZERO
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl From<[u8; 6]> for Mac {
    fn from(value: [u8; 6]) -> Self {
        Mac(value)
    }
}

impl From<Mac> for [u8; 6] {
    fn from(value: Mac) -> Self {
        value.0
    }
}

impl AsRef<[u8; 6]> for Mac {
    fn as_ref(&self) -> &[u8; 6] {
        &self.0
    }
}

/// Errors which can occur while converting a string to a [`Mac`]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MacFromStringError {
    /// Invalid string representation of mac address
    #[error("invalid string representation of mac address: {0}")]
    Invalid(String),
}

impl TryFrom<&str> for Mac {
    type Error = MacFromStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || MacFromStringError::Invalid(value.to_string());
        let mut octets = [0u8; 6];
        let mut count = 0;
        for octet_str in value.split(':') {
            if octet_str.len() != 2 || !octet_str.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let slot = octets.get_mut(count).ok_or_else(invalid)?;
            *slot = u8::from_str_radix(octet_str, 16).map_err(|_| invalid())?;
            count += 1;
        }
        if count != octets.len() {
            return Err(invalid());
        }
        Ok(Mac(octets))
    }
}

impl FromStr for Mac {
    type Err = MacFromStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mac::try_from(s)
    }
}

impl Display for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for Mac {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Mac {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Mac::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

#[cfg(any(test, feature = "testing"))]
mod contract {
    use super::Mac;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for Mac {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(Mac(driver.produce()?))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::{Mac, MacFromStringError};

    #[test]
    fn parse_and_display() {
        let mac = Mac::try_from("00:00:0a:00:01:ff").unwrap();
        assert_eq!(mac, Mac([0, 0, 0x0a, 0, 0x01, 0xff]));
        assert_eq!(mac.to_string(), "00:00:0a:00:01:ff");
        assert_eq!(Mac::try_from("00:00:0A:00:01:FF").unwrap(), mac);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in [
            "",
            "00:00:00:00:00",
            "00:00:00:00:00:00:00",
            "0:00:00:00:00:00",
            "zz:00:00:00:00:00",
            "00-00-00-00-00-00",
        ] {
            assert_eq!(
                Mac::try_from(bad),
                Err(MacFromStringError::Invalid(bad.to_string()))
            );
        }
    }

    #[test]
    fn display_parse_identity() {
        bolero::check!().with_type::<Mac>().for_each(|mac: &Mac| {
            assert_eq!(Mac::try_from(mac.to_string().as_str()).unwrap(), *mac);
        });
    }
}
