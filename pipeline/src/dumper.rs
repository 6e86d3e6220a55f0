// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::NetworkFunction;
use arc_swap::ArcSwapOption;
use net::packet::{DoneReason, Packet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Predicate selecting the packets a [`PacketDumper`] logs
pub type DumperFilter = Box<dyn Fn(&Packet) -> bool + Send + Sync>;

/// Stage logging the packets that cross it, with their flow and metadata.
///
/// Dumping can be switched on and off and narrowed by a filter while the pipeline
/// runs. Packets always go through unchanged.
pub struct PacketDumper {
    name: String,
    enabled: AtomicBool,
    count: u64,
    filter: ArcSwapOption<DumperFilter>,
}

impl PacketDumper {
    /// Filter keeping the packets some stage decided to drop
    #[must_use]
    pub fn drops_only() -> DumperFilter {
        Box::new(|packet: &Packet| {
            !matches!(packet.get_done(), None | Some(DoneReason::Delivered))
        })
    }

    #[must_use]
    pub fn new(name: &str, enabled: bool, filter: Option<DumperFilter>) -> Self {
        Self {
            name: name.to_owned(),
            enabled: AtomicBool::new(enabled),
            count: 0,
            filter: ArcSwapOption::from_pointee(filter),
        }
    }
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }
    pub fn set_filter(&self, filter: impl Fn(&Packet) -> bool + Send + Sync + 'static) {
        self.filter.swap(Some(Arc::new(Box::new(filter))));
    }
    /// Number of packets dumped so far
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl NetworkFunction for PacketDumper {
    fn process<'a, Input: Iterator<Item = Packet> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet> + 'a {
        let enabled = self.enabled();
        let filter = self.filter.load_full();
        input.inspect(move |packet| {
            if enabled && filter.as_ref().is_none_or(|f| f(packet)) {
                debug!(
                    "@{}, packet ({}) flow {} meta {:?}",
                    self.name,
                    self.count,
                    packet.flow_key(),
                    packet.get_meta()
                );
                self.count += 1;
            }
        })
    }
}
