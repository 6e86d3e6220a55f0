// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Periodic polling of the byte counters of nodes, and their scheduled reset.
//!
//! Polling only reads. Resetting is the one thing the monitor changes on nodes: it
//! bounds how long a burst of traffic keeps a port above the threshold.

use config::MonitorConfig;
use futures::future::join_all;
use net::ids::{NodeId, PortId};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use topology::Topology;
use tracing::{debug, info, warn};

use crate::device::DeviceMap;

/// Gauge with the last polled value of each counter
pub const METRIC_PORT_BYTES: &str = "adaptive_port_bytes";
/// Counter of the resets of the counters of each node
pub const METRIC_COUNTER_RESETS: &str = "adaptive_counter_resets";

/// One counter value read from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSample {
    pub node: NodeId,
    pub port: PortId,
    pub bytes: u64,
}

#[allow(clippy::cast_precision_loss)]
fn publish(sample: &CounterSample) {
    metrics::gauge!(
        METRIC_PORT_BYTES,
        "node" => sample.node.to_string(),
        "port" => sample.port.to_string()
    )
    .set(sample.bytes as f64);
}

pub struct Monitor {
    devices: DeviceMap,
    ports: BTreeMap<NodeId, Vec<PortId>>,
    config: MonitorConfig,
}

impl Monitor {
    /// A monitor polling the given ports of each node
    #[must_use]
    pub fn new(
        devices: DeviceMap,
        ports: BTreeMap<NodeId, Vec<PortId>>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            devices,
            ports,
            config,
        }
    }

    /// A monitor polling all the ports in use of every node of a topology that has a device
    #[must_use]
    pub fn from_topology(topology: &Topology, devices: DeviceMap, config: MonitorConfig) -> Self {
        let ports = devices
            .keys()
            .map(|node| (node.clone(), topology.ports(node)))
            .collect();
        Self::new(devices, ports, config)
    }

    /// Read every counter once. Counters that can't be read are skipped.
    pub async fn poll_once(&self) -> Vec<CounterSample> {
        let polls = self.devices.iter().map(|(node, device)| async move {
            let mut samples = vec![];
            for port in self.ports.get(node).into_iter().flatten() {
                match device.read_counter(*port).await {
                    Ok(bytes) => samples.push(CounterSample {
                        node: node.clone(),
                        port: *port,
                        bytes,
                    }),
                    Err(e) => warn!("{node}: failed to read counter of port {port}: {e}"),
                }
            }
            samples
        });
        let samples: Vec<CounterSample> = join_all(polls).await.into_iter().flatten().collect();
        for sample in &samples {
            publish(sample);
            if sample.bytes > 0 {
                info!("{} port {}: {} bytes", sample.node, sample.port, sample.bytes);
            }
        }
        debug!("Polled {} counters", samples.len());
        samples
    }

    /// Reset the counters of every node. Returns how many nodes were reset.
    pub async fn reset_all(&self) -> usize {
        let resets = self.devices.iter().map(|(node, device)| async move {
            match device.reset_counters().await {
                Ok(()) => {
                    metrics::counter!(METRIC_COUNTER_RESETS, "node" => node.to_string())
                        .increment(1);
                    true
                }
                Err(e) => {
                    warn!("{node}: failed to reset counters: {e}");
                    false
                }
            }
        });
        let done = join_all(resets).await.into_iter().filter(|ok| *ok).count();
        info!("Reset counters of {done} of {} nodes", self.devices.len());
        done
    }

    /// Poll and reset on the configured schedule until `shutdown` turns true or its
    /// sender goes away. The first poll happens right away, the first reset after a full
    /// reset interval.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut poll = interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reset = self.config.reset_interval().map(|period| {
            let mut reset = interval_at(Instant::now() + period, period);
            reset.set_missed_tick_behavior(MissedTickBehavior::Delay);
            reset
        });
        info!(
            "Monitoring {} nodes every {} ms, {}",
            self.devices.len(),
            self.config.poll_interval_ms,
            match self.config.reset_interval_ms {
                Some(ms) => format!("resetting counters every {ms} ms"),
                None => "never resetting counters".to_owned(),
            }
        );

        loop {
            let next_reset = async {
                match reset.as_mut() {
                    Some(reset) => {
                        reset.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = poll.tick() => {
                    self.poll_once().await;
                }
                () = next_reset => {
                    self.reset_all().await;
                }
            }
        }
        info!("Monitor stopped");
    }
}
