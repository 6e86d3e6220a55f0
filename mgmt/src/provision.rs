// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Installation of node programs and thresholds through device clients.
//!
//! Nodes are provisioned concurrently and independently. A node whose device keeps
//! failing is retried with bounded exponential backoff and then reported as failed; the
//! other nodes are provisioned regardless.

use config::RetryPolicy;
use futures::future::join_all;
use net::ids::NodeId;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;
use topology::Topology;
use tracing::{debug, error, info, warn};

use crate::device::{DeviceError, DeviceMap};
use crate::program::{FabricProgram, ProgramSummary, Unrouted};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("No device to reach node {0}")]
    NoDevice(NodeId),
    #[error("Gave up on node {node} after {attempts} attempts: {source}")]
    Exhausted {
        node: NodeId,
        attempts: u32,
        source: DeviceError,
    },
}

/// Run `op` until it succeeds or the policy runs out of attempts
async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    node: &NodeId,
    what: &str,
    mut op: F,
) -> Result<T, ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeviceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{node}: {what} failed (attempt {attempt} of {}): {e}. Retrying in {} ms",
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("{node}: {what} failed after {attempt} attempts: {e}");
                return Err(ProvisionError::Exhausted {
                    node: node.clone(),
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// The outcome of provisioning a fabric
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    /// What got installed on every node, or why it could not be
    pub nodes: BTreeMap<NodeId, Result<ProgramSummary, ProvisionError>>,
    /// Prefixes that nodes have no route for
    pub unrouted: Vec<Unrouted>,
}

impl ProvisionReport {
    /// True if every node got its program
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.nodes.values().all(Result::is_ok)
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(node, _)| node)
            .collect()
    }

    #[must_use]
    pub fn installed(&self, node: &NodeId) -> Option<&ProgramSummary> {
        self.nodes.get(node).and_then(|outcome| outcome.as_ref().ok())
    }
}

impl Display for ProvisionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (node, outcome) in &self.nodes {
            match outcome {
                Ok(summary) => writeln!(f, " {node}: {summary}")?,
                Err(e) => writeln!(f, " {node}: FAILED: {e}")?,
            }
        }
        for unrouted in &self.unrouted {
            writeln!(f, " {}: no route to {}", unrouted.node, unrouted.prefix)?;
        }
        Ok(())
    }
}

/// Pushes forwarding state and thresholds to nodes
pub struct Provisioner {
    devices: DeviceMap,
    retry: RetryPolicy,
}

impl Provisioner {
    #[must_use]
    pub fn new(devices: DeviceMap, retry: RetryPolicy) -> Self {
        Self { devices, retry }
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceMap {
        &self.devices
    }

    /// Compute the programs of all the nodes of a topology and install them
    pub async fn provision_topology(&self, topology: &Topology) -> ProvisionReport {
        let fabric = FabricProgram::compute(topology);
        self.provision(&fabric).await
    }

    /// Install the programs of a fabric on their nodes, replacing their tables. Every
    /// attempt on a node starts by clearing its tables.
    pub async fn provision(&self, fabric: &FabricProgram) -> ProvisionReport {
        info!("Provisioning {} nodes..", fabric.programs.len());
        let pushes = fabric.programs.iter().map(|(node, program)| async move {
            let Some(device) = self.devices.get(node) else {
                error!("No device for node {node}");
                return (node.clone(), Err(ProvisionError::NoDevice(node.clone())));
            };
            let outcome = retry(&self.retry, node, "table installation", || {
                program.install(device.as_ref())
            })
            .await
            .map(|()| program.summary());
            if let Ok(summary) = &outcome {
                debug!("{node}: installed {summary}");
            }
            (node.clone(), outcome)
        });
        let report = ProvisionReport {
            nodes: join_all(pushes).await.into_iter().collect(),
            unrouted: fabric.unrouted.clone(),
        };
        if report.is_complete() {
            info!("Provisioned all nodes:\n{report}");
        } else {
            error!("Provisioning incomplete:\n{report}");
        }
        report
    }

    /// Write the load threshold of every node. Independent of table provisioning.
    pub async fn set_thresholds(&self, value: u64) -> BTreeMap<NodeId, Result<(), ProvisionError>> {
        info!("Setting threshold to {value} bytes on {} nodes", self.devices.len());
        let writes = self.devices.iter().map(|(node, device)| async move {
            let outcome = retry(&self.retry, node, "threshold write", || {
                device.write_threshold(value)
            })
            .await;
            (node.clone(), outcome)
        });
        join_all(writes).await.into_iter().collect()
    }
}
