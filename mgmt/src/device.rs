// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The channel to manage a forwarding node remotely

use async_trait::async_trait;
use concurrency::sync::Arc;
use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use routing::{EcmpGroupId, NextHop, RouteAction};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Node rejected the request: {0}")]
    Rejected(String),
    #[error("Timeout: node did not answer in time")]
    Timeout,
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Bad answer from node: {0}")]
    BadResponse(String),
    #[error("Port {0} has no counter")]
    NoSuchPort(PortId),
}

/// Operations to program the tables of a node and to access its counters.
/// Every call may fail, e.g. if the node can't be reached.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Name of the node this client manages
    fn node(&self) -> &NodeId;

    async fn add_route(&self, prefix: Ipv4Prefix, action: RouteAction) -> Result<(), DeviceError>;
    async fn add_ecmp_group(
        &self,
        group: EcmpGroupId,
        count: u16,
        base: u16,
    ) -> Result<(), DeviceError>;
    async fn add_ecmp_member(
        &self,
        group: EcmpGroupId,
        index: u16,
        nhop: NextHop,
    ) -> Result<(), DeviceError>;
    async fn add_alternate(&self, port: PortId, nhop: NextHop) -> Result<(), DeviceError>;
    async fn add_source_mac(&self, port: PortId, mac: Mac) -> Result<(), DeviceError>;

    /// Remove every entry from every table
    async fn clear_tables(&self) -> Result<(), DeviceError>;

    /// Set the load threshold of the node. 0 disables rerouting.
    async fn write_threshold(&self, value: u64) -> Result<(), DeviceError>;
    async fn read_counter(&self, port: PortId) -> Result<u64, DeviceError>;
    async fn reset_counters(&self) -> Result<(), DeviceError>;
}

/// Device clients by node name
pub type DeviceMap = BTreeMap<NodeId, Arc<dyn DeviceClient>>;
