// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::fmt::Display;
use std::num::NonZeroU64;

/// Load threshold of a node. The raw value `0` is the disabled sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// Never reroute
    #[default]
    Disabled,
    /// Reroute away from ports whose counter exceeds this many bytes
    Bytes(NonZeroU64),
}

impl Threshold {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Threshold::Disabled)
    }

    /// Tell if a counter value is above this threshold
    #[must_use]
    pub fn exceeded_by(&self, count: u64) -> bool {
        match self {
            Threshold::Disabled => false,
            Threshold::Bytes(limit) => count > limit.get(),
        }
    }

    /// The value as written in a threshold register
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        match self {
            Threshold::Disabled => 0,
            Threshold::Bytes(limit) => limit.get(),
        }
    }
}

impl From<u64> for Threshold {
    fn from(value: u64) -> Self {
        NonZeroU64::new(value).map_or(Threshold::Disabled, Threshold::Bytes)
    }
}

impl From<Threshold> for u64 {
    fn from(value: Threshold) -> Self {
        value.as_u64()
    }
}

impl Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threshold::Disabled => write!(f, "disabled"),
            Threshold::Bytes(limit) => write!(f, "{limit} bytes"),
        }
    }
}
