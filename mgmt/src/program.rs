// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translation of shortest-path results into the table entries of every node.
//!
//! For every host prefix, the node the host hangs off gets a direct route to the host.
//! Every other node routes the prefix toward that node: a direct route if a single
//! minimal-cost first hop exists, an ECMP group if there are several. Unreachable
//! prefixes get no route and are reported. Members of a group are the sorted first
//! hops, in hash slots `0..k`, and the alternate of member `i` is member `(i + 1) % k`.
//! Groups with identical members are installed once per node.

use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::{NodeId, PortId};
use routing::{EcmpGroupId, EcmpGroupInfo, NextHop, RouteAction};
use std::collections::BTreeMap;
use std::fmt::Display;
use topology::{Hop, Reachability, Spt, Topology, compute_all, equal_cost_paths};
use tracing::{debug, warn};

use crate::device::{DeviceClient, DeviceError};

/// Number of entries of each table in a [`NodeProgram`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramSummary {
    pub routes: usize,
    pub groups: usize,
    pub members: usize,
    pub alternates: usize,
    pub source_macs: usize,
}

impl Display for ProgramSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} routes, {} groups, {} members, {} alternates, {} source macs",
            self.routes, self.groups, self.members, self.alternates, self.source_macs
        )
    }
}

/// The table entries of one node, in installation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProgram {
    pub node: NodeId,
    pub routes: Vec<(Ipv4Prefix, RouteAction)>,
    pub groups: Vec<(EcmpGroupId, EcmpGroupInfo)>,
    pub members: Vec<(EcmpGroupId, u16, NextHop)>,
    pub alternates: Vec<(PortId, NextHop)>,
    pub source_macs: Vec<(PortId, Mac)>,
}

impl NodeProgram {
    fn new(node: &NodeId) -> Self {
        Self {
            node: node.clone(),
            routes: vec![],
            groups: vec![],
            members: vec![],
            alternates: vec![],
            source_macs: vec![],
        }
    }

    #[must_use]
    pub fn summary(&self) -> ProgramSummary {
        ProgramSummary {
            routes: self.routes.len(),
            groups: self.groups.len(),
            members: self.members.len(),
            alternates: self.alternates.len(),
            source_macs: self.source_macs.len(),
        }
    }

    #[must_use]
    pub fn route(&self, prefix: &Ipv4Prefix) -> Option<RouteAction> {
        self.routes
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, action)| *action)
    }

    /// Members of a group, by hash slot
    #[must_use]
    pub fn group_members(&self, group: EcmpGroupId) -> Vec<NextHop> {
        self.members
            .iter()
            .filter(|(g, _, _)| *g == group)
            .map(|(_, _, nhop)| *nhop)
            .collect()
    }

    #[must_use]
    pub fn alternate(&self, port: PortId) -> Option<NextHop> {
        self.alternates
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, nhop)| *nhop)
    }

    /// Push the program to a device, replacing whatever it had. Groups go before their
    /// members and before the routes that refer to them.
    ///
    /// # Errors
    ///
    /// Fails on the first call the device fails
    pub async fn install(&self, device: &dyn DeviceClient) -> Result<(), DeviceError> {
        device.clear_tables().await?;
        for (group, info) in &self.groups {
            device.add_ecmp_group(*group, info.count, info.base).await?;
        }
        for (group, index, nhop) in &self.members {
            device.add_ecmp_member(*group, *index, *nhop).await?;
        }
        for (prefix, action) in &self.routes {
            device.add_route(*prefix, *action).await?;
        }
        for (port, nhop) in &self.alternates {
            device.add_alternate(*port, *nhop).await?;
        }
        for (port, mac) in &self.source_macs {
            device.add_source_mac(*port, *mac).await?;
        }
        Ok(())
    }

    fn intern_group(
        &mut self,
        interned: &mut BTreeMap<Vec<NextHop>, EcmpGroupId>,
        members: Vec<NextHop>,
    ) -> Option<EcmpGroupId> {
        if let Some(group) = interned.get(&members) {
            return Some(*group);
        }
        let count = u16::try_from(members.len()).ok()?;
        let group = EcmpGroupId::new(u16::try_from(interned.len() + 1).ok()?);
        self.groups.push((group, EcmpGroupInfo::new(count, 0)));
        for (index, nhop) in (0..count).zip(&members) {
            self.members.push((group, index, *nhop));
        }
        for (i, nhop) in members.iter().enumerate() {
            let alternate = members[(i + 1) % members.len()];
            if self.alternate(nhop.port).is_none() {
                self.alternates.push((nhop.port, alternate));
            }
        }
        interned.insert(members, group);
        Some(group)
    }
}

/// A prefix a node has no route for, because its host is unreachable from the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unrouted {
    pub node: NodeId,
    pub prefix: Ipv4Prefix,
}

/// The programs of all the nodes of a topology
#[derive(Debug, Clone, Default)]
pub struct FabricProgram {
    pub programs: BTreeMap<NodeId, NodeProgram>,
    pub unrouted: Vec<Unrouted>,
}

fn next_hop(topology: &Topology, hop: &Hop) -> Option<NextHop> {
    topology
        .port_mac(&hop.neighbor, hop.remote_port)
        .map(|mac| NextHop::new(hop.local_port, mac))
}

impl FabricProgram {
    /// Compute the program of every node of a topology
    #[must_use]
    pub fn compute(topology: &Topology) -> Self {
        let spts = compute_all(topology);
        let mut fabric = FabricProgram::default();
        for (name, spt) in &spts {
            let program = Self::compute_node(topology, spt, &mut fabric.unrouted);
            debug!("Program for {name}: {}", program.summary());
            fabric.programs.insert(name.clone(), program);
        }
        fabric
    }

    fn compute_node(topology: &Topology, spt: &Spt, unrouted: &mut Vec<Unrouted>) -> NodeProgram {
        let name = spt.source();
        let mut program = NodeProgram::new(name);
        let mut interned = BTreeMap::new();

        for (attached, host) in topology.hosts() {
            if attached.name == *name {
                let nhop = NextHop::new(host.port, host.mac);
                program.routes.push((host.prefix, RouteAction::Forward(nhop)));
                continue;
            }
            match spt.reachability(&attached.name) {
                Reachability::Reachable { cost, nexthops } => {
                    let members: Vec<NextHop> = nexthops
                        .iter()
                        .filter_map(|hop| next_hop(topology, hop))
                        .collect();
                    let action = match members.as_slice() {
                        [] => None,
                        [single] => Some(RouteAction::Forward(*single)),
                        _ => {
                            if let Ok(paths) = equal_cost_paths(topology, name, &attached.name) {
                                for path in paths {
                                    debug!("{name} -> {}: {path}", host.prefix);
                                }
                            }
                            let width = members.len();
                            let group = program.intern_group(&mut interned, members);
                            if group.is_none() {
                                warn!("{name}: can't install group of {width} members at cost {cost}");
                            }
                            group.map(RouteAction::Ecmp)
                        }
                    };
                    if let Some(action) = action {
                        program.routes.push((host.prefix, action));
                    }
                }
                Reachability::Unreachable | Reachability::Local => {
                    warn!(
                        "{name}: no path to {} ({}), leaving it unrouted",
                        attached.name, host.prefix
                    );
                    unrouted.push(Unrouted {
                        node: name.clone(),
                        prefix: host.prefix,
                    });
                }
            }
        }

        if let Some(node) = topology.node(name) {
            program.source_macs = topology
                .ports(name)
                .into_iter()
                .map(|port| (port, node.port_mac(port)))
                .collect();
        }
        program
    }

    #[must_use]
    pub fn program(&self, node: &NodeId) -> Option<&NodeProgram> {
        self.programs.get(node)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topology::samples::{SCENARIO_HOST_PORT, scenario, six_switch};
    use topology::{HostAttachment, Link, Node};

    fn prefix(s: &str) -> Ipv4Prefix {
        s.parse().unwrap()
    }

    fn ecmp_group(program: &NodeProgram, p: &str) -> EcmpGroupId {
        match program.route(&prefix(p)) {
            Some(RouteAction::Ecmp(group)) => group,
            other => panic!("no ECMP route for {p}: {other:?}"),
        }
    }

    #[test]
    fn scenario_groups_and_alternates() {
        let fabric = FabricProgram::compute(&scenario(4));
        let a = fabric.program(&NodeId::from("A")).unwrap();

        // local host
        assert_eq!(
            a.route(&prefix("10.0.1.0/24")),
            Some(RouteAction::Forward(NextHop::new(
                PortId::new(SCENARIO_HOST_PORT),
                Mac([0, 0, 0, 0, 1, 1])
            )))
        );

        // two equal paths to B, via C (port 2) and via E (port 3)
        let group = ecmp_group(a, "10.0.2.0/24");
        let members = a.group_members(group);
        let via_c = NextHop::new(PortId::new(2), Mac([0, 0, 3, 0, 0, 1]));
        let via_e = NextHop::new(PortId::new(3), Mac([0, 0, 5, 0, 0, 1]));
        assert_eq!(members, vec![via_c, via_e]);
        assert_eq!(a.groups, vec![(group, EcmpGroupInfo::new(2, 0))]);
        assert_eq!(a.alternate(PortId::new(2)), Some(via_e));
        assert_eq!(a.alternate(PortId::new(3)), Some(via_c));

        // one source mac per port in use
        assert_eq!(
            a.source_macs.iter().map(|(p, _)| p.as_u16()).collect::<Vec<_>>(),
            vec![1, 2, 3, SCENARIO_HOST_PORT]
        );
        assert_eq!(a.source_macs[1].1, Mac([0, 0, 1, 0, 0, 2]));
        assert!(fabric.unrouted.is_empty());
    }

    #[test]
    fn single_path_is_a_direct_route() {
        let fabric = FabricProgram::compute(&scenario(1));
        let a = fabric.program(&NodeId::from("A")).unwrap();
        assert_eq!(
            a.route(&prefix("10.0.2.0/24")),
            Some(RouteAction::Forward(NextHop::new(
                PortId::new(1),
                Mac([0, 0, 2, 0, 0, 1])
            )))
        );
        assert!(a.groups.is_empty());
        assert!(a.alternates.is_empty());

        let d = fabric.program(&NodeId::from("D")).unwrap();
        assert!(matches!(
            d.route(&prefix("10.0.2.0/24")),
            Some(RouteAction::Forward(nhop)) if nhop.port == PortId::new(2)
        ));
        // C is at distance 2 from B both through A and through D
        let c = fabric.program(&NodeId::from("C")).unwrap();
        let group = ecmp_group(c, "10.0.2.0/24");
        assert_eq!(c.group_members(group).len(), 2);
    }

    #[test]
    fn three_way_tie() {
        let fabric = FabricProgram::compute(&scenario(3));
        let a = fabric.program(&NodeId::from("A")).unwrap();
        let group = ecmp_group(a, "10.0.2.0/24");
        let ports: Vec<u16> = a
            .group_members(group)
            .iter()
            .map(|n| n.port.as_u16())
            .collect();
        // sorted by neighbor: B, C, E
        assert_eq!(ports, vec![1, 2, 3]);
        assert_eq!(a.alternate(PortId::new(1)).unwrap().port, PortId::new(2));
        assert_eq!(a.alternate(PortId::new(3)).unwrap().port, PortId::new(1));
    }

    #[test]
    fn identical_groups_are_shared() {
        let fabric = FabricProgram::compute(&six_switch());
        let s5 = fabric.program(&NodeId::from("s5")).unwrap();
        // s1 is adjacent to s5, s2 is two hops away through s1 or s6
        let to_h1 = s5.route(&prefix("10.0.1.0/24")).unwrap();
        let to_h2 = s5.route(&prefix("10.0.2.0/24")).unwrap();
        assert!(matches!(to_h1, RouteAction::Forward(_)));
        assert!(matches!(to_h2, RouteAction::Ecmp(_)));

        for program in fabric.programs.values() {
            let mut lists: Vec<Vec<NextHop>> = program
                .groups
                .iter()
                .map(|(g, _)| program.group_members(*g))
                .collect();
            let count = lists.len();
            lists.sort();
            lists.dedup();
            assert_eq!(lists.len(), count, "duplicate group on {}", program.node);
            for (group, info) in &program.groups {
                assert_eq!(usize::from(info.count), program.group_members(*group).len());
            }
        }
    }

    #[test]
    fn deterministic() {
        let one = FabricProgram::compute(&six_switch());
        let two = FabricProgram::compute(&six_switch());
        assert_eq!(one.programs, two.programs);
    }

    #[test]
    fn unreachable_hosts_are_reported() {
        let mut nodes: Vec<Node> = scenario(4).nodes().cloned().collect();
        nodes.push(Node::new("Z", 9).with_host(isolated_host()));
        let links: Vec<Link> = scenario(4).links().to_vec();
        let topology = Topology::new(nodes, links).unwrap();
        let fabric = FabricProgram::compute(&topology);

        let a = fabric.program(&NodeId::from("A")).unwrap();
        assert_eq!(a.route(&prefix("10.9.0.0/16")), None);
        let unrouted: Vec<&str> = fabric
            .unrouted
            .iter()
            .filter(|u| u.prefix == prefix("10.9.0.0/16"))
            .map(|u| u.node.as_str())
            .collect();
        assert_eq!(unrouted, vec!["A", "B", "C", "D", "E", "F"]);

        // Z can't reach anyone either
        let z = fabric.program(&NodeId::from("Z")).unwrap();
        assert_eq!(z.routes.len(), 1);
        assert_eq!(fabric.unrouted.len(), 8);
    }

    fn isolated_host() -> HostAttachment {
        HostAttachment {
            name: "hz".to_owned(),
            prefix: prefix("10.9.0.0/16"),
            port: PortId::new(1),
            mac: Mac([0, 0, 0, 0, 9, 1]),
        }
    }
}
