// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Construction of the device clients of the nodes of a topology

use concurrency::sync::Arc;
use config::ControllerConfig;
use counters::PortCounters;
use dataplane::start_node;
use mgmt::{DeviceClient, DeviceMap, LocalDevice, SimpleSwitchCli};
use net::ids::NodeId;
use routing::TablesReader;
use std::collections::BTreeMap;
use topology::Topology;
use tracing::{debug, info};

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MissingThriftPort(pub NodeId);

impl std::fmt::Display for MissingThriftPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node {} has no thrift-port", self.0)
    }
}

/// A client per node, driving the CLI of the node's software switch
pub(crate) fn cli_devices(
    topology: &Topology,
    config: &ControllerConfig,
) -> Result<DeviceMap, MissingThriftPort> {
    let mut devices = DeviceMap::new();
    for node in topology.nodes() {
        let port = node
            .thrift_port
            .ok_or_else(|| MissingThriftPort(node.name.clone()))?;
        debug!("Node {} is reached on thrift port {port}", node.name);
        let cli = SimpleSwitchCli::new(
            &node.name,
            &config.device.cli_path,
            port,
            config.device.timeout(),
        );
        let device: Arc<dyn DeviceClient> = Arc::new(cli);
        devices.insert(node.name.clone(), device);
    }
    Ok(devices)
}

/// In-process nodes standing in for the nodes of a topology
pub(crate) struct SimFabric {
    pub devices: DeviceMap,
    tables: BTreeMap<NodeId, TablesReader>,
}

impl SimFabric {
    pub fn new(topology: &Topology) -> Self {
        let mut devices = DeviceMap::new();
        let mut tables = BTreeMap::new();
        for node in topology.nodes() {
            let setup = start_node(&node.name, Arc::new(PortCounters::default()));
            tables.insert(node.name.clone(), setup.tables.as_tables_reader());
            let device: Arc<dyn DeviceClient> = Arc::new(LocalDevice::new(
                &node.name,
                setup.tables,
                setup.counters,
            ));
            devices.insert(node.name.clone(), device);
        }
        Self { devices, tables }
    }

    /// Log the tables of every node
    pub fn dump(&self) {
        for (node, reader) in &self.tables {
            if let Some(tables) = reader.enter() {
                info!("Tables of {node}:\n{}", *tables);
            }
        }
    }

    #[cfg(test)]
    pub fn tables(&self, node: &str) -> Option<routing::ForwardingTables> {
        self.tables
            .get(&NodeId::from(node))
            .and_then(|r| r.enter().map(|t| t.clone()))
    }
}
