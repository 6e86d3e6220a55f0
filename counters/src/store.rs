// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::{PortCounters, Threshold};
use concurrency::sync::Arc;
use net::ids::{NodeId, PortId};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("No counters for node {0}")]
    UnknownNode(NodeId),
}

/// Access to the counters of a set of nodes
pub trait CounterStore {
    /// Bytes counted on a port of a node since its last reset
    fn read(&self, node: &NodeId, port: PortId) -> Result<u64, CounterError>;
    /// Account bytes on a port of a node, returning the new count
    fn increment(&self, node: &NodeId, port: PortId, delta: u64) -> Result<u64, CounterError>;
    /// Zero all the counters of a node
    fn reset(&self, node: &NodeId) -> Result<(), CounterError>;
    fn threshold(&self, node: &NodeId) -> Result<Threshold, CounterError>;
    fn set_threshold(&self, node: &NodeId, threshold: Threshold) -> Result<(), CounterError>;
}

/// The counters of every node simulated in this process
#[derive(Debug, Default)]
pub struct CounterRegistry {
    nodes: BTreeMap<NodeId, Arc<PortCounters>>,
}

impl CounterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the counters of a node, or return the existing ones
    pub fn register(&mut self, node: &NodeId, ports: usize) -> Arc<PortCounters> {
        self.nodes
            .entry(node.clone())
            .or_insert_with(|| {
                info!("Created {ports} port counters for node {node}");
                Arc::new(PortCounters::new(ports))
            })
            .clone()
    }

    #[must_use]
    pub fn get(&self, node: &NodeId) -> Option<&Arc<PortCounters>> {
        self.nodes.get(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    fn node(&self, node: &NodeId) -> Result<&PortCounters, CounterError> {
        self.nodes
            .get(node)
            .map(AsRef::as_ref)
            .ok_or_else(|| CounterError::UnknownNode(node.clone()))
    }
}

impl CounterStore for CounterRegistry {
    fn read(&self, node: &NodeId, port: PortId) -> Result<u64, CounterError> {
        Ok(self.node(node)?.get(port))
    }

    fn increment(&self, node: &NodeId, port: PortId, delta: u64) -> Result<u64, CounterError> {
        Ok(self.node(node)?.add(port, delta))
    }

    fn reset(&self, node: &NodeId) -> Result<(), CounterError> {
        self.node(node)?.reset();
        Ok(())
    }

    fn threshold(&self, node: &NodeId) -> Result<Threshold, CounterError> {
        Ok(self.node(node)?.threshold())
    }

    fn set_threshold(&self, node: &NodeId, threshold: Threshold) -> Result<(), CounterError> {
        self.node(node)?.set_threshold(threshold);
        Ok(())
    }
}
