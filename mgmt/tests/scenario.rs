// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Provision a fabric of in-process nodes and walk packets through it

#![allow(clippy::unwrap_used)]

use concurrency::sync::Arc;
use config::{MonitorConfig, RetryPolicy};
use counters::PortCounters;
use dataplane::{ForwardingNode, NodeSetup, Verdict, start_node};
use adaptive_mgmt::{DeviceClient, DeviceMap, LocalDevice, Monitor, Provisioner};
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use net::packet::test_utils::{TEST_TTL, udp_frame};
use net::packet::{DoneReason, ForwardDecision, Packet};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use topology::samples::{SCENARIO_HOST_PORT, scenario};
use topology::{HostAttachment, Node, Topology};

struct Fabric {
    topology: Topology,
    devices: DeviceMap,
    workers: BTreeMap<NodeId, ForwardingNode>,
    counters: BTreeMap<NodeId, Arc<PortCounters>>,
}

impl Fabric {
    fn new(topology: Topology) -> Self {
        let mut devices = DeviceMap::new();
        let mut workers = BTreeMap::new();
        let mut counters = BTreeMap::new();
        for node in topology.nodes() {
            let NodeSetup {
                name,
                tables,
                counters: store,
                pipeline,
            } = start_node(&node.name, Arc::new(PortCounters::new(16)));
            let device: Arc<dyn DeviceClient> =
                Arc::new(LocalDevice::new(&name, tables, store.clone()));
            devices.insert(name.clone(), device);
            workers.insert(name.clone(), ForwardingNode::new(&name, pipeline()));
            counters.insert(name, store);
        }
        Self {
            topology,
            devices,
            workers,
            counters,
        }
    }

    fn worker(&mut self, name: &str) -> &mut ForwardingNode {
        self.workers.get_mut(&NodeId::from(name)).unwrap()
    }

    fn counters(&self, name: &str) -> &PortCounters {
        &self.counters[&NodeId::from(name)]
    }

    /// Forward a frame hop by hop from `node` until it leaves the fabric or is dropped.
    /// Returns the nodes visited and the last verdict.
    fn walk(&mut self, node: &str, frame: &[u8]) -> (Vec<String>, Verdict) {
        let mut node = NodeId::from(node);
        let mut frame = frame.to_vec();
        let mut visited = vec![];
        loop {
            visited.push(node.to_string());
            let verdict = self.workers.get_mut(&node).unwrap().forward(&frame);
            let Verdict::Forwarded {
                port, frame: out, ..
            } = &verdict
            else {
                return (visited, verdict);
            };
            let next = self
                .topology
                .adjacencies(&node)
                .find(|adj| adj.local_port == *port)
                .map(|adj| adj.neighbor.clone());
            match next {
                Some(neighbor) => {
                    node = neighbor;
                    frame.clone_from(out);
                }
                None => return (visited, verdict),
            }
        }
    }
}

async fn provisioned(topology: Topology, threshold: u64) -> Fabric {
    let fabric = Fabric::new(topology);
    let provisioner = Provisioner::new(fabric.devices.clone(), RetryPolicy::default());
    let report = provisioner.provision_topology(&fabric.topology).await;
    assert!(report.is_complete(), "{report}");
    let thresholds = provisioner.set_thresholds(threshold).await;
    assert!(thresholds.values().all(Result::is_ok));
    fabric
}

const HB_MAC: Mac = Mac([0, 0, 0, 0, 2, 1]);

#[tokio::test]
async fn end_to_end_delivery() {
    let mut fabric = provisioned(scenario(4), 2_000_000).await;
    let (visited, verdict) = fabric.walk("A", &udp_frame("10.0.1.5", "10.0.2.5", 4000, 80, 100));

    assert_eq!(visited.len(), 4);
    assert_eq!(visited.first().map(String::as_str), Some("A"));
    assert_eq!(visited.last().map(String::as_str), Some("B"));
    assert!(visited[1] == "C" || visited[1] == "E");

    let Verdict::Forwarded { port, frame, .. } = verdict else {
        panic!("not delivered: {verdict:?}");
    };
    assert_eq!(port, PortId::new(SCENARIO_HOST_PORT));
    let packet = Packet::parse(&frame).unwrap();
    assert_eq!(packet.eth().destination(), HB_MAC);
    assert_eq!(packet.eth().source(), Mac([0, 0, 2, 0, 0, 10]));
    assert_eq!(packet.ipv4().ttl(), TEST_TTL - 4);
}

#[tokio::test]
async fn congested_member_is_rerouted() {
    let mut fabric = provisioned(scenario(4), 2_000_000).await;
    let frame = udp_frame("10.0.1.5", "10.0.2.5", 4000, 80, 100);

    let verdict = fabric.worker("A").forward(&frame);
    assert_eq!(verdict.decision(), Some(ForwardDecision::EcmpPrimary));
    let primary = verdict.port().unwrap();
    let alternate = if primary == PortId::new(2) {
        PortId::new(3)
    } else {
        PortId::new(2)
    };
    let wire_len = u64::try_from(frame.len()).unwrap();
    assert_eq!(fabric.counters("A").get(primary), wire_len);

    fabric.counters("A").add(primary, 3_000_000);
    let verdict = fabric.worker("A").forward(&frame);
    assert_eq!(verdict.decision(), Some(ForwardDecision::EcmpRerouted));
    assert_eq!(verdict.port(), Some(alternate));
    // the alternate is charged, the primary is not
    assert_eq!(fabric.counters("A").get(primary), wire_len + 3_000_000);
    assert_eq!(fabric.counters("A").get(alternate), wire_len);

    // the rerouted packet still makes it to B
    let (visited, verdict) = fabric.walk("A", &frame);
    assert_eq!(visited.last().map(String::as_str), Some("B"));
    assert!(!verdict.is_dropped());

    // a reset brings the flow back on its primary path
    let monitor = Monitor::from_topology(
        &fabric.topology,
        fabric.devices.clone(),
        MonitorConfig::default(),
    );
    assert_eq!(monitor.reset_all().await, 6);
    let verdict = fabric.worker("A").forward(&frame);
    assert_eq!(verdict.decision(), Some(ForwardDecision::EcmpPrimary));
    assert_eq!(verdict.port(), Some(primary));
}

#[tokio::test]
async fn disabled_threshold_never_reroutes() {
    let mut fabric = provisioned(scenario(4), 0).await;
    let frame = udp_frame("10.0.1.5", "10.0.2.5", 4000, 80, 100);
    let primary = fabric.worker("A").forward(&frame).port().unwrap();
    fabric.counters("A").add(primary, u64::MAX);
    for _ in 0..10 {
        let verdict = fabric.worker("A").forward(&frame);
        assert_eq!(verdict.decision(), Some(ForwardDecision::EcmpPrimary));
        assert_eq!(verdict.port(), Some(primary));
    }
}

#[tokio::test]
async fn direct_routes_are_not_counted() {
    let mut fabric = provisioned(scenario(1), 2_000_000).await;
    let verdict = fabric
        .worker("A")
        .forward(&udp_frame("10.0.1.5", "10.0.2.5", 4000, 80, 100));
    assert_eq!(verdict.decision(), Some(ForwardDecision::Direct));
    assert!(fabric.counters("A").snapshot().iter().all(|c| *c == 0));
}

#[tokio::test]
async fn flows_spread_over_members() {
    let mut fabric = provisioned(scenario(4), 0).await;
    let mut ports = BTreeMap::new();
    for sport in 0..64 {
        let frame = udp_frame("10.0.1.5", "10.0.2.5", 10_000 + sport, 80, 0);
        let port = fabric.worker("A").forward(&frame).port().unwrap();
        *ports.entry(port).or_insert(0) += 1;
    }
    assert_eq!(
        ports.keys().copied().collect::<Vec<_>>(),
        vec![PortId::new(2), PortId::new(3)]
    );
}

#[tokio::test]
async fn unreachable_destination_is_dropped() {
    let mut nodes: Vec<Node> = scenario(4).nodes().cloned().collect();
    nodes.push(Node::new("Z", 9).with_host(HostAttachment {
        name: "hz".to_owned(),
        prefix: "10.9.0.0/16".parse().unwrap(),
        port: PortId::new(1),
        mac: Mac([0, 0, 0, 0, 9, 1]),
    }));
    let topology = Topology::new(nodes, scenario(4).links().to_vec()).unwrap();

    let mut fabric = Fabric::new(topology);
    let provisioner = Provisioner::new(fabric.devices.clone(), RetryPolicy::once());
    let report = provisioner.provision_topology(&fabric.topology).await;
    // an unreachable prefix is not a provisioning failure
    assert!(report.is_complete());
    assert!(
        report
            .unrouted
            .iter()
            .any(|u| u.node.as_str() == "A" && u.prefix.to_string() == "10.9.0.0/16")
    );

    for sport in 0..8 {
        let verdict = fabric
            .worker("A")
            .forward(&udp_frame("10.0.1.5", "10.9.1.1", sport, 80, 10));
        assert_eq!(verdict, Verdict::Dropped(DoneReason::RouteFailure));
    }
    assert_eq!(
        fabric.worker("A").stats().get_stat(DoneReason::RouteFailure),
        Some(8)
    );
}
