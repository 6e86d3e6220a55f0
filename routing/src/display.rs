// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display of forwarding tables

use crate::tables::{ForwardingTables, NextHop, RouteAction};
use std::fmt::Display;

impl Display for NextHop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port {} via {}", self.port, self.mac)
    }
}

impl Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteAction::Forward(nhop) => write!(f, "forward {nhop}"),
            RouteAction::Ecmp(group) => write!(f, "ecmp group {group}"),
            RouteAction::Drop => write!(f, "drop"),
        }
    }
}

impl Display for ForwardingTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " ━━━━━━━━━ Forwarding tables (version {}) ━━━━━━━━━", self.version())?;
        writeln!(f, " routes ({}):", self.len_routes())?;
        for (prefix, action) in self.routes() {
            writeln!(f, "   {prefix:<18} {action}")?;
        }
        writeln!(f, " ecmp groups ({}):", self.len_groups())?;
        for (group, info) in self.groups() {
            writeln!(f, "   {group:<4} members: {} base: {}", info.count, info.base)?;
        }
        writeln!(f, " ecmp members ({}):", self.len_members())?;
        for ((group, index), nhop) in self.members() {
            writeln!(f, "   [{group}, {index}] {nhop}")?;
        }
        writeln!(f, " alternates ({}):", self.len_alternates())?;
        for (port, nhop) in self.alternates() {
            writeln!(f, "   port {port:<4} -> {nhop}")?;
        }
        writeln!(f, " source macs ({}):", self.len_source_macs())?;
        for (port, mac) in self.source_macs() {
            writeln!(f, "   port {port:<4} {mac}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::tables::{EcmpGroupId, EcmpGroupInfo, ForwardingTables, NextHop, RouteAction};
    use net::eth::mac::Mac;
    use net::ids::PortId;

    #[test]
    fn tables_dump() {
        let mut tables = ForwardingTables::new();
        let nhop = NextHop::new(PortId::new(2), Mac([0, 0, 3, 0, 0, 1]));
        let gid = EcmpGroupId::new(1);
        tables.add_route("10.0.2.0/24".parse().unwrap(), RouteAction::Ecmp(gid));
        tables.add_group(gid, EcmpGroupInfo::new(1, 0));
        tables.add_member(gid, 0, nhop);
        let out = tables.to_string();
        assert!(out.contains("10.0.2.0/24"));
        assert!(out.contains("ecmp group 1"));
        assert!(out.contains("[1, 0] port 2 via 00:00:03:00:00:01"));
    }
}
