// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Shortest path computation with equal-cost next hops.
//!
//! A Dijkstra run from a source node yields, for every other node, its distance and the
//! set of first hops out of the source that lie on some shortest path towards it. Ties
//! are kept: a node reached at the same distance through two different first hops gets
//! both. The set is sorted, so that repeated runs over the same topology produce the same
//! next hops in the same order.

use crate::model::{Topology, TopologyError};
use net::ids::{NodeId, PortId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// A first hop out of the source of a shortest path tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hop {
    pub neighbor: NodeId,
    pub local_port: PortId,
    pub remote_port: PortId,
}

/// What a source knows about reaching a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The destination is the source itself
    Local,
    /// There is no path
    Unreachable,
    /// Minimal cost and the first hops achieving it, sorted and never empty
    Reachable { cost: u64, nexthops: Vec<Hop> },
}

impl Reachability {
    /// Number of equal-cost first hops
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Reachability::Reachable { nexthops, .. } => nexthops.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    cost: u64,
    nexthops: BTreeSet<Hop>,
}

/// Shortest path tree rooted at one node
#[derive(Debug, Clone)]
pub struct Spt {
    source: NodeId,
    vertices: BTreeMap<NodeId, Vertex>,
}

impl Spt {
    #[must_use]
    pub fn source(&self) -> &NodeId {
        &self.source
    }

    #[must_use]
    pub fn reachability(&self, destination: &NodeId) -> Reachability {
        if *destination == self.source {
            return Reachability::Local;
        }
        match self.vertices.get(destination) {
            None => Reachability::Unreachable,
            Some(vertex) => Reachability::Reachable {
                cost: vertex.cost,
                nexthops: vertex.nexthops.iter().cloned().collect(),
            },
        }
    }

    /// Distance to a node, if reachable
    #[must_use]
    pub fn distance(&self, destination: &NodeId) -> Option<u64> {
        self.vertices.get(destination).map(|v| v.cost)
    }
}

/// Run Dijkstra from `source`.
///
/// Distances are settled first. First hops are then propagated along the links that lie on
/// a shortest path, until no set grows, so that zero-cost links between nodes at the same
/// distance contribute their first hops whatever the order nodes were settled in.
///
/// # Errors
///
/// Fails if `source` is not a node of the topology.
pub fn compute_spt(topology: &Topology, source: &NodeId) -> Result<Spt, TopologyError> {
    if topology.node(source).is_none() {
        return Err(TopologyError::UnknownNode(source.clone()));
    }

    let distances = shortest_distances(topology, source);

    // nodes in settling order: distance, then name
    let mut order: Vec<(&NodeId, u64)> = distances
        .iter()
        .filter(|(id, _)| *id != source)
        .map(|(id, cost)| (id, *cost))
        .collect();
    order.sort_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| a.cmp(b)));

    let mut nexthops: BTreeMap<NodeId, BTreeSet<Hop>> = BTreeMap::new();
    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let mut grew = false;
        for (id, cost) in &order {
            let mut reached = BTreeSet::new();
            for adj in topology.adjacencies(id) {
                let Some(pred_cost) = distances.get(adj.neighbor) else {
                    continue;
                };
                if pred_cost.saturating_add(u64::from(adj.cost)) != *cost {
                    continue;
                }
                if adj.neighbor == source {
                    reached.insert(Hop {
                        neighbor: (*id).clone(),
                        local_port: adj.remote_port,
                        remote_port: adj.local_port,
                    });
                } else if let Some(inherited) = nexthops.get(adj.neighbor) {
                    reached.extend(inherited.iter().cloned());
                }
            }
            let entry = nexthops.entry((*id).clone()).or_default();
            if reached.len() > entry.len() {
                *entry = reached;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    trace!("SPF {source}: next hops settled after {rounds} rounds");

    let vertices: BTreeMap<NodeId, Vertex> = order
        .into_iter()
        .map(|(id, cost)| {
            let nexthops = nexthops.remove(id).unwrap_or_default();
            (id.clone(), Vertex { cost, nexthops })
        })
        .collect();

    debug!(
        "SPF {source}: {} of {} nodes reachable",
        vertices.len(),
        topology.nodes().count().saturating_sub(1)
    );
    Ok(Spt {
        source: source.clone(),
        vertices,
    })
}

/// Minimal cost from `source` to every node it reaches, itself included
fn shortest_distances(topology: &Topology, source: &NodeId) -> BTreeMap<NodeId, u64> {
    let mut settled: BTreeMap<NodeId, u64> = BTreeMap::new();
    // candidates are ordered by distance, then by name
    let mut candidates: BTreeSet<(u64, NodeId)> = BTreeSet::new();
    let mut tentative: HashMap<NodeId, u64> = HashMap::new();

    candidates.insert((0, source.clone()));
    tentative.insert(source.clone(), 0);

    while let Some((cost, id)) = candidates.pop_first() {
        trace!("SPF {source}: settled {id} at cost {cost}");
        for adj in topology.adjacencies(&id) {
            if settled.contains_key(adj.neighbor) || adj.neighbor == &id {
                continue;
            }
            let new_cost = cost.saturating_add(u64::from(adj.cost));
            match tentative.get(adj.neighbor).copied() {
                Some(old) if new_cost >= old => {}
                old => {
                    if let Some(old) = old {
                        candidates.remove(&(old, adj.neighbor.clone()));
                    }
                    tentative.insert(adj.neighbor.clone(), new_cost);
                    candidates.insert((new_cost, adj.neighbor.clone()));
                }
            }
        }
        settled.insert(id, cost);
    }
    settled
}

/// Run Dijkstra from every node of the topology
#[must_use]
pub fn compute_all(topology: &Topology) -> BTreeMap<NodeId, Spt> {
    topology
        .nodes()
        .filter_map(|node| {
            compute_spt(topology, &node.name)
                .ok()
                .map(|spt| (node.name.clone(), spt))
        })
        .collect()
}

/// A loop-free sequence of nodes, from source to destination
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub cost: u64,
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.nodes.iter().map(NodeId::as_str).collect();
        write!(f, "{} (cost {})", names.join(" -> "), self.cost)
    }
}

/// Enumerate every shortest path between two nodes, sorted.
///
/// Parallel links between the same pair of nodes do not produce distinct paths. An
/// unreachable destination yields no path; `source == destination` yields the trivial one.
///
/// # Errors
///
/// Fails if either node is not part of the topology.
pub fn equal_cost_paths(
    topology: &Topology,
    source: &NodeId,
    destination: &NodeId,
) -> Result<Vec<Path>, TopologyError> {
    if topology.node(destination).is_none() {
        return Err(TopologyError::UnknownNode(destination.clone()));
    }
    let spt = compute_spt(topology, source)?;
    let distance = |n: &NodeId| {
        if n == source {
            Some(0)
        } else {
            spt.distance(n)
        }
    };
    let Some(total) = distance(destination) else {
        return Ok(vec![]);
    };

    // walk the shortest-path DAG backwards from the destination
    let mut paths = BTreeSet::new();
    let mut stack = vec![vec![destination.clone()]];
    while let Some(partial) = stack.pop() {
        let Some(head) = partial.last() else {
            continue;
        };
        if head == source {
            let mut nodes = partial.clone();
            nodes.reverse();
            paths.insert(Path { nodes, cost: total });
            continue;
        }
        let Some(head_distance) = distance(head) else {
            continue;
        };
        let predecessors: BTreeSet<&NodeId> = topology
            .adjacencies(head)
            .filter(|adj| {
                distance(adj.neighbor)
                    .is_some_and(|d| d.saturating_add(u64::from(adj.cost)) == head_distance)
            })
            .map(|adj| adj.neighbor)
            .filter(|n| !partial.contains(n))
            .collect();
        for pred in predecessors {
            let mut next = partial.clone();
            next.push(pred.clone());
            stack.push(next);
        }
    }
    Ok(paths.into_iter().collect())
}
