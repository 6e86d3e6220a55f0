// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-process device: programs the tables of a node living in the same process

use async_trait::async_trait;
use concurrency::sync::{Arc, Mutex};
use counters::{PortCounters, Threshold};
use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use routing::{
    EcmpGroupId, EcmpGroupInfo, NextHop, RouteAction, TableChange, TablesError, TablesWriter,
};
use tracing::debug;

use crate::device::{DeviceClient, DeviceError};

/// A [`DeviceClient`] over the table writer and the counters of a node. Every change is
/// published as soon as it is applied.
pub struct LocalDevice {
    name: NodeId,
    tables: Mutex<TablesWriter>,
    counters: Arc<PortCounters>,
}

impl LocalDevice {
    #[must_use]
    pub fn new(name: &NodeId, tables: TablesWriter, counters: Arc<PortCounters>) -> Self {
        Self {
            name: name.clone(),
            tables: Mutex::new(tables),
            counters,
        }
    }

    fn update(&self, change: TableChange) -> Result<(), DeviceError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DeviceError::Transport("table writer poisoned".to_owned()))?;
        if let TableChange::AddMember(group, index, _) = &change {
            let current = tables
                .enter()
                .ok_or_else(|| DeviceError::Transport("tables are gone".to_owned()))?;
            current
                .check_member(*group, *index)
                .map_err(|e: TablesError| DeviceError::Rejected(e.to_string()))?;
        }
        debug!("{}: applying {change:?}", self.name);
        tables.apply(change, true);
        Ok(())
    }
}

#[async_trait]
impl DeviceClient for LocalDevice {
    fn node(&self) -> &NodeId {
        &self.name
    }
    async fn add_route(&self, prefix: Ipv4Prefix, action: RouteAction) -> Result<(), DeviceError> {
        self.update(TableChange::AddRoute(prefix, action))
    }
    async fn add_ecmp_group(
        &self,
        group: EcmpGroupId,
        count: u16,
        base: u16,
    ) -> Result<(), DeviceError> {
        self.update(TableChange::AddGroup(group, EcmpGroupInfo::new(count, base)))
    }
    async fn add_ecmp_member(
        &self,
        group: EcmpGroupId,
        index: u16,
        nhop: NextHop,
    ) -> Result<(), DeviceError> {
        self.update(TableChange::AddMember(group, index, nhop))
    }
    async fn add_alternate(&self, port: PortId, nhop: NextHop) -> Result<(), DeviceError> {
        self.update(TableChange::AddAlternate(port, nhop))
    }
    async fn add_source_mac(&self, port: PortId, mac: Mac) -> Result<(), DeviceError> {
        self.update(TableChange::AddSourceMac(port, mac))
    }
    async fn clear_tables(&self) -> Result<(), DeviceError> {
        self.update(TableChange::Clear)
    }
    async fn write_threshold(&self, value: u64) -> Result<(), DeviceError> {
        self.counters.set_threshold(Threshold::from(value));
        Ok(())
    }
    async fn read_counter(&self, port: PortId) -> Result<u64, DeviceError> {
        if port.index() >= self.counters.width() {
            return Err(DeviceError::NoSuchPort(port));
        }
        Ok(self.counters.get(port))
    }
    async fn reset_counters(&self) -> Result<(), DeviceError> {
        self.counters.reset();
        Ok(())
    }
}
