// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::Threshold;
use concurrency::sync::atomic::{AtomicU64, Ordering};
use net::ids::PortId;
use tracing::debug;

/// Number of counters of a node unless told otherwise
pub const DEFAULT_PORT_COUNT: usize = 512;

/// The byte counters of the ports of one node, plus its threshold register.
///
/// Ports beyond the configured width have no counter: they read as zero load
/// and increments on them are ignored.
#[derive(Debug)]
pub struct PortCounters {
    bytes: Box<[AtomicU64]>,
    threshold: AtomicU64,
}

impl Default for PortCounters {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_COUNT)
    }
}

impl PortCounters {
    #[must_use]
    pub fn new(ports: usize) -> Self {
        Self {
            bytes: (0..ports).map(|_| AtomicU64::new(0)).collect(),
            threshold: AtomicU64::new(0),
        }
    }

    /// Number of ports with a counter
    #[must_use]
    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes counted on `port` since the last reset
    #[must_use]
    pub fn get(&self, port: PortId) -> u64 {
        self.bytes
            .get(port.index())
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Account `delta` bytes to `port` and return the new count.
    pub fn add(&self, port: PortId, delta: u64) -> u64 {
        let Some(counter) = self.bytes.get(port.index()) else {
            return 0;
        };
        let value = counter.load(Ordering::Relaxed).saturating_add(delta);
        counter.store(value, Ordering::Relaxed);
        value
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in &self.bytes {
            counter.store(0, Ordering::Relaxed);
        }
        debug!("Reset {} port counters", self.bytes.len());
    }

    /// Values of all counters, indexed by port number
    #[must_use]
    pub fn snapshot(&self) -> Vec<u64> {
        self.bytes
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        Threshold::from(self.threshold.load(Ordering::Relaxed))
    }

    pub fn set_threshold(&self, threshold: Threshold) {
        self.threshold.store(threshold.as_u64(), Ordering::Relaxed);
    }

    /// Tell if the counter of `port` is above the current threshold
    #[must_use]
    pub fn over_threshold(&self, port: PortId) -> bool {
        let threshold = self.threshold();
        !threshold.is_disabled() && threshold.exceeded_by(self.get(port))
    }
}
