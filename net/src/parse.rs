// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Errors which may occur when a frame cannot be parsed up to its IPv4 header
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("truncated ethernet header: {0} bytes")]
    TruncatedEth(usize),
    #[error("not an IPv4 frame (ethertype {0:#06x})")]
    NotIpv4(u16),
    #[error("invalid IPv4 header: {0}")]
    InvalidIpv4(String),
}
