// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Reference topologies

use crate::model::{HostAttachment, Link, Node, Topology};
use net::eth::mac::Mac;
use net::ids::PortId;

fn host(name: &str, prefix: &str, port: u16, mac: [u8; 6]) -> HostAttachment {
    HostAttachment {
        name: name.to_owned(),
        prefix: prefix
            .parse()
            .unwrap_or_else(|e| unreachable!("bad sample prefix {prefix}: {e}")),
        port: PortId::new(port),
        mac: Mac(mac),
    }
}

fn build(nodes: Vec<Node>, links: Vec<Link>) -> Topology {
    Topology::new(nodes, links).unwrap_or_else(|e| unreachable!("bad sample topology: {e}"))
}

/// Six switches with three parallel routes between `s1` and `s2`:
///
/// ```text
///    h1 -- s1 ========= s2 -- h2
///           |  \     /   |
///           |   s3-s4    |
///           |  /     \   |
///    h3 -- s5 ========= s6 -- h4
/// ```
///
/// All links have cost 1 and 10 Mbit/s capacity; hosts sit on port 1.
#[must_use]
pub fn six_switch() -> Topology {
    let nodes = vec![
        Node::new("s1", 1)
            .with_thrift_port(9090)
            .with_host(host("h1", "10.0.1.0/24", 1, [0, 0, 0, 0, 1, 1])),
        Node::new("s2", 2)
            .with_thrift_port(9091)
            .with_host(host("h2", "10.0.2.0/24", 1, [0, 0, 0, 0, 2, 1])),
        Node::new("s3", 3).with_thrift_port(9092),
        Node::new("s4", 4).with_thrift_port(9093),
        Node::new("s5", 5)
            .with_thrift_port(9094)
            .with_host(host("h3", "10.0.5.0/24", 1, [0, 0, 0, 0, 5, 1])),
        Node::new("s6", 6)
            .with_thrift_port(9095)
            .with_host(host("h4", "10.0.6.0/24", 1, [0, 0, 0, 0, 6, 1])),
    ];
    let links = [
        ("s1", 2, "s2", 2),
        ("s1", 3, "s3", 1),
        ("s3", 2, "s4", 1),
        ("s4", 2, "s2", 3),
        ("s1", 4, "s5", 2),
        ("s5", 3, "s6", 2),
        ("s6", 3, "s2", 4),
        ("s3", 3, "s5", 4),
        ("s4", 3, "s6", 4),
    ]
    .into_iter()
    .map(|(a, ap, b, bp)| Link::new(a, ap, b, bp, 1).with_capacity(10))
    .collect();
    build(nodes, links)
}

/// Host port of the nodes of [`scenario`]
pub const SCENARIO_HOST_PORT: u16 = 10;

/// Two three-hop detours between `A` and `B` plus a direct link of cost `ab_cost`:
///
/// ```text
///        +------ ab_cost ------+
///        |                     |
///   hA - A -- C ---- D ------- B - hB
///        |                     |
///        +--- E ---- F --------+
/// ```
///
/// `A` reaches `C` on port 2 and `E` on port 3, the direct link uses port 1 at both ends.
/// `hA` is `10.0.1.0/24` and `hB` is `10.0.2.0/24`, both on port 10.
#[must_use]
pub fn scenario(ab_cost: u32) -> Topology {
    let nodes = vec![
        Node::new("A", 1).with_host(host(
            "hA",
            "10.0.1.0/24",
            SCENARIO_HOST_PORT,
            [0, 0, 0, 0, 1, 1],
        )),
        Node::new("B", 2).with_host(host(
            "hB",
            "10.0.2.0/24",
            SCENARIO_HOST_PORT,
            [0, 0, 0, 0, 2, 1],
        )),
        Node::new("C", 3),
        Node::new("D", 4),
        Node::new("E", 5),
        Node::new("F", 6),
    ];
    let links = vec![
        Link::new("A", 1, "B", 1, ab_cost),
        Link::new("A", 2, "C", 1, 1),
        Link::new("C", 2, "D", 1, 1),
        Link::new("D", 2, "B", 2, 1),
        Link::new("A", 3, "E", 1, 1),
        Link::new("E", 2, "F", 1, 1),
        Link::new("F", 2, "B", 3, 1),
    ];
    build(nodes, links)
}
