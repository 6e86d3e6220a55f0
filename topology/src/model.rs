// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Failed to read topology: {0}")]
    Io(String),
    #[error("Failed to parse topology: {0}")]
    Yaml(String),
    #[error("Node {0} is defined more than once")]
    DuplicateNode(NodeId),
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Link {0}:{1} connects the node to itself")]
    SelfLoop(NodeId, PortId),
    #[error("Port {1} of node {0} is used more than once")]
    PortInUse(NodeId, PortId),
    #[error("Prefix {0} is attached to more than one host")]
    DuplicatePrefix(Ipv4Prefix),
}

/// A host (or subnet) hanging off a port of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostAttachment {
    pub name: String,
    pub prefix: Ipv4Prefix,
    pub port: PortId,
    pub mac: Mac,
}

/// A forwarding node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Node {
    pub name: NodeId,
    pub device_id: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thrift_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<HostAttachment>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str, device_id: u8) -> Self {
        Self {
            name: NodeId::from(name),
            device_id,
            thrift_port: None,
            hosts: vec![],
        }
    }

    #[must_use]
    pub fn with_thrift_port(mut self, port: u16) -> Self {
        self.thrift_port = Some(port);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: HostAttachment) -> Self {
        self.hosts.push(host);
        self
    }

    /// Mac address of one of the ports of this node: `00:00:<device-id>:00:<port-hi>:<port-lo>`
    #[must_use]
    pub fn port_mac(&self, port: PortId) -> Mac {
        let [hi, lo] = port.as_u16().to_be_bytes();
        Mac([0, 0, self.device_id, 0, hi, lo])
    }
}

/// An undirected link between two node ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Link {
    pub a: NodeId,
    pub a_port: PortId,
    pub b: NodeId,
    pub b_port: PortId,
    pub cost: u32,
    /// Capacity in Mbit/s, zero if unknown
    #[serde(default)]
    pub capacity: u64,
}

impl Link {
    #[must_use]
    pub fn new(a: &str, a_port: u16, b: &str, b_port: u16, cost: u32) -> Self {
        Self {
            a: NodeId::from(a),
            a_port: PortId::new(a_port),
            b: NodeId::from(b),
            b_port: PortId::new(b_port),
            cost,
            capacity: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }
}

/// One direction of a link, as seen from the node it leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency<'a> {
    pub neighbor: &'a NodeId,
    pub local_port: PortId,
    pub remote_port: PortId,
    pub cost: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopologyFile {
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<Link>,
}

/// A validated topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    links: Vec<Link>,
}

impl Topology {
    /// Build a topology, checking that it is consistent
    ///
    /// # Errors
    ///
    /// Fails on duplicate nodes, links to unknown nodes, self loops, ports used twice on a
    /// node or prefixes attached to more than one host.
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Result<Self, TopologyError> {
        let mut map = BTreeMap::new();
        for node in nodes {
            let name = node.name.clone();
            if map.insert(name.clone(), node).is_some() {
                return Err(TopologyError::DuplicateNode(name));
            }
        }
        let topology = Self { nodes: map, links };
        topology.validate()?;
        debug!(
            "Topology has {} nodes and {} links",
            topology.nodes.len(),
            topology.links.len()
        );
        Ok(topology)
    }

    fn validate(&self) -> Result<(), TopologyError> {
        fn claim(
            used: &mut BTreeSet<(NodeId, PortId)>,
            node: &NodeId,
            port: PortId,
        ) -> Result<(), TopologyError> {
            if used.insert((node.clone(), port)) {
                Ok(())
            } else {
                Err(TopologyError::PortInUse(node.clone(), port))
            }
        }
        let mut used_ports = BTreeSet::new();
        let mut prefixes = BTreeSet::new();
        for node in self.nodes.values() {
            for host in &node.hosts {
                claim(&mut used_ports, &node.name, host.port)?;
                if !prefixes.insert(host.prefix) {
                    return Err(TopologyError::DuplicatePrefix(host.prefix));
                }
            }
        }
        for link in &self.links {
            for end in [&link.a, &link.b] {
                if !self.nodes.contains_key(end) {
                    return Err(TopologyError::UnknownNode(end.clone()));
                }
            }
            if link.a == link.b {
                return Err(TopologyError::SelfLoop(link.a.clone(), link.a_port));
            }
            claim(&mut used_ports, &link.a, link.a_port)?;
            claim(&mut used_ports, &link.b, link.b_port)?;
        }
        Ok(())
    }

    /// Parse and validate a YAML topology
    ///
    /// # Errors
    ///
    /// Fails if the document is not a valid topology.
    pub fn from_yaml(yaml: &str) -> Result<Self, TopologyError> {
        let file: TopologyFile =
            serde_yaml_ng::from_str(yaml).map_err(|e| TopologyError::Yaml(e.to_string()))?;
        Self::new(file.nodes, file.links)
    }

    /// Load a YAML topology from a file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid topology.
    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::Io(format!("{}: {e}", path.display())))?;
        let topology = Self::from_yaml(&yaml)?;
        info!(
            "Loaded topology from {}: {} nodes, {} links",
            path.display(),
            topology.nodes.len(),
            topology.links.len()
        );
        Ok(topology)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Fails if serialization fails.
    pub fn to_yaml(&self) -> Result<String, TopologyError> {
        let file = TopologyFile {
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.clone(),
        };
        serde_yaml_ng::to_string(&file).map_err(|e| TopologyError::Yaml(e.to_string()))
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes, sorted by name
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The links leaving `node`, in the order they were declared
    pub fn adjacencies<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = Adjacency<'a>> {
        self.links.iter().filter_map(move |link| {
            if &link.a == node {
                Some(Adjacency {
                    neighbor: &link.b,
                    local_port: link.a_port,
                    remote_port: link.b_port,
                    cost: link.cost,
                })
            } else if &link.b == node {
                Some(Adjacency {
                    neighbor: &link.a,
                    local_port: link.b_port,
                    remote_port: link.a_port,
                    cost: link.cost,
                })
            } else {
                None
            }
        })
    }

    /// All the ports of a node that are in use, host-facing or not, sorted
    #[must_use]
    pub fn ports(&self, node: &NodeId) -> Vec<PortId> {
        let mut ports: Vec<PortId> = self.adjacencies(node).map(|a| a.local_port).collect();
        if let Some(n) = self.nodes.get(node) {
            ports.extend(n.hosts.iter().map(|h| h.port));
        }
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Mac address of a port of a node
    #[must_use]
    pub fn port_mac(&self, node: &NodeId, port: PortId) -> Option<Mac> {
        self.nodes.get(node).map(|n| n.port_mac(port))
    }

    /// Every host attachment with the node it hangs off, sorted by node then declaration order
    pub fn hosts(&self) -> impl Iterator<Item = (&Node, &HostAttachment)> {
        self.nodes
            .values()
            .flat_map(|node| node.hosts.iter().map(move |h| (node, h)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::samples::six_switch;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    const YAML: &str = r"
nodes:
  - name: s1
    device-id: 1
    thrift-port: 9090
    hosts:
      - name: h1
        prefix: 10.0.1.0/24
        port: 1
        mac: 00:00:00:00:01:01
  - name: s2
    device-id: 2
links:
  - { a: s1, a-port: 2, b: s2, b-port: 2, cost: 1, capacity: 10 }
";

    #[test]
    fn parse_yaml() {
        let topo = Topology::from_yaml(YAML).unwrap();
        let s1 = topo.node(&NodeId::from("s1")).unwrap();
        assert_eq!(s1.thrift_port, Some(9090));
        assert_eq!(s1.hosts[0].prefix.to_string(), "10.0.1.0/24");
        assert_eq!(s1.hosts[0].mac, Mac([0, 0, 0, 0, 1, 1]));
        assert_eq!(topo.links()[0].capacity, 10);
        assert_eq!(
            topo.ports(&NodeId::from("s1")),
            vec![PortId::new(1), PortId::new(2)]
        );

        let s2 = NodeId::from("s2");
        let adj: Vec<_> = topo.adjacencies(&s2).collect();
        assert_eq!(adj.len(), 1);
        assert_eq!(adj[0].neighbor, &NodeId::from("s1"));
        assert_eq!(adj[0].local_port, PortId::new(2));
    }

    #[test]
    #[traced_test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("topology-{}.yaml", std::process::id()));
        std::fs::write(&path, YAML).unwrap();
        let topo = Topology::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(topo.nodes().count(), 2);
        assert!(logs_contain("Loaded topology"));
        assert!(matches!(
            Topology::from_file(&path),
            Err(TopologyError::Io(_))
        ));
    }

    #[test]
    fn yaml_round_trip_of_sample() {
        let topo = six_switch();
        let again = Topology::from_yaml(&topo.to_yaml().unwrap()).unwrap();
        assert_eq!(topo, again);
    }

    #[test]
    fn port_macs() {
        let node = Node::new("s3", 3);
        assert_eq!(node.port_mac(PortId::new(2)).to_string(), "00:00:03:00:00:02");
        assert_eq!(
            node.port_mac(PortId::new(0x1ff)).to_string(),
            "00:00:03:00:01:ff"
        );
    }

    #[test]
    fn rejects_inconsistencies() {
        let nodes = || vec![Node::new("a", 1), Node::new("b", 2)];
        assert_eq!(
            Topology::new(vec![Node::new("a", 1), Node::new("a", 2)], vec![]),
            Err(TopologyError::DuplicateNode(NodeId::from("a")))
        );
        assert_eq!(
            Topology::new(nodes(), vec![Link::new("a", 1, "c", 1, 1)]),
            Err(TopologyError::UnknownNode(NodeId::from("c")))
        );
        assert_eq!(
            Topology::new(nodes(), vec![Link::new("a", 1, "a", 2, 1)]),
            Err(TopologyError::SelfLoop(NodeId::from("a"), PortId::new(1)))
        );
        assert_eq!(
            Topology::new(
                nodes(),
                vec![Link::new("a", 1, "b", 1, 1), Link::new("a", 1, "b", 2, 1)]
            ),
            Err(TopologyError::PortInUse(NodeId::from("a"), PortId::new(1)))
        );

        let host = |name: &str, port| HostAttachment {
            name: name.to_owned(),
            prefix: "10.0.0.0/24".parse().unwrap(),
            port: PortId::new(port),
            mac: Mac([0, 0, 0, 0, 0, 1]),
        };
        assert_eq!(
            Topology::new(
                vec![
                    Node::new("a", 1).with_host(host("h1", 1)),
                    Node::new("b", 2).with_host(host("h2", 1)),
                ],
                vec![]
            ),
            Err(TopologyError::DuplicatePrefix("10.0.0.0/24".parse().unwrap()))
        );
        assert!(matches!(
            Topology::from_yaml("nodes: 3"),
            Err(TopologyError::Yaml(_))
        ));
    }
}
