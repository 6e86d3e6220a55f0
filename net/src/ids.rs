// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Identifiers of forwarding nodes and their ports

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Name of a forwarding node (e.g. `s1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An egress or ingress port number of a node
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PortId(u16);

impl PortId {
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self(port)
    }
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }
}

impl From<u16> for PortId {
    fn from(port: u16) -> Self {
        Self(port)
    }
}

impl Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
