// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The match-action tables consulted by the forwarding pipeline of a node

use ahash::RandomState;
use lpm::prefix::{Ipv4Addr, Ipv4Prefix};
use lpm::trie::{PrefixMapTrie, TrieMap};
use net::eth::mac::Mac;
use net::ids::PortId;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

/// Identifier of an ECMP group, local to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EcmpGroupId(u16);

impl EcmpGroupId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for EcmpGroupId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl Display for EcmpGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An egress port and the link-layer address of the neighbor behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NextHop {
    pub port: PortId,
    pub mac: Mac,
}

impl NextHop {
    #[must_use]
    pub fn new(port: PortId, mac: Mac) -> Self {
        Self { port, mac }
    }
}

/// What to do with a packet whose destination matched a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    Forward(NextHop),
    Ecmp(EcmpGroupId),
    Drop,
}

/// Size and first hash slot of an ECMP group. Slots of a group are
/// `[base, base + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcmpGroupInfo {
    pub count: u16,
    pub base: u16,
}

impl EcmpGroupInfo {
    #[must_use]
    pub fn new(count: u16, base: u16) -> Self {
        Self { count, base }
    }
    /// Tell if `index` is one of the hash slots of the group
    #[must_use]
    pub fn contains(&self, index: u16) -> bool {
        index >= self.base && u32::from(index) < u32::from(self.base) + u32::from(self.count)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TablesError {
    #[error("No ECMP group with id {0}")]
    UnknownGroup(EcmpGroupId),
    #[error("Hash index {index} is out of range for ECMP group {group} ({count} members from {base})")]
    MemberOutOfRange {
        group: EcmpGroupId,
        index: u16,
        count: u16,
        base: u16,
    },
}

/// The routing, ECMP group, ECMP member, alternate next-hop and source MAC
/// tables of one node.
#[derive(Clone, Debug)]
pub struct ForwardingTables {
    routes: PrefixMapTrie<RouteAction>,
    groups: HashMap<EcmpGroupId, EcmpGroupInfo, RandomState>,
    members: HashMap<(EcmpGroupId, u16), NextHop, RandomState>,
    alternates: HashMap<PortId, NextHop, RandomState>,
    smacs: HashMap<PortId, Mac, RandomState>,
    version: u64,
}

impl Default for ForwardingTables {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardingTables {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: PrefixMapTrie::new(),
            groups: HashMap::with_hasher(RandomState::with_seed(0)),
            members: HashMap::with_hasher(RandomState::with_seed(0)),
            alternates: HashMap::with_hasher(RandomState::with_seed(0)),
            smacs: HashMap::with_hasher(RandomState::with_seed(0)),
            version: 0,
        }
    }

    /// Number of changes absorbed so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Add a route, replacing any route for the same prefix
    pub fn add_route(&mut self, prefix: Ipv4Prefix, action: RouteAction) -> Option<RouteAction> {
        debug!("Adding route to {prefix}: {action}");
        self.routes.insert(prefix, action)
    }
    pub fn del_route(&mut self, prefix: &Ipv4Prefix) -> Option<RouteAction> {
        debug!("Removing route to {prefix}");
        self.routes.remove(prefix)
    }
    pub fn add_group(&mut self, group: EcmpGroupId, info: EcmpGroupInfo) {
        debug!(
            "Adding ECMP group {group}: {} members from slot {}",
            info.count, info.base
        );
        self.groups.insert(group, info);
    }
    pub fn add_member(&mut self, group: EcmpGroupId, index: u16, nhop: NextHop) {
        debug!("Adding member {index} of ECMP group {group}: {nhop}");
        self.members.insert((group, index), nhop);
    }

    /// Add an alternate next hop for `port`. If `port` already has one, it is kept and
    /// `false` is returned.
    pub fn add_alternate(&mut self, port: PortId, nhop: NextHop) -> bool {
        if let Some(existing) = self.alternates.get(&port) {
            debug!("Port {port} keeps alternate {existing}, ignoring {nhop}");
            return false;
        }
        debug!("Adding alternate for port {port}: {nhop}");
        self.alternates.insert(port, nhop);
        true
    }
    pub fn add_source_mac(&mut self, port: PortId, mac: Mac) {
        self.smacs.insert(port, mac);
    }

    /// Empty every table. The version keeps counting.
    pub fn clear(&mut self) {
        debug!("Clearing forwarding tables");
        self.routes.clear();
        self.groups.clear();
        self.members.clear();
        self.alternates.clear();
        self.smacs.clear();
    }

    /// Check that `index` is a valid hash slot of an installed `group`
    ///
    /// # Errors
    ///
    /// Fails if the group is unknown or the slot is outside its range
    pub fn check_member(&self, group: EcmpGroupId, index: u16) -> Result<(), TablesError> {
        let info = self
            .groups
            .get(&group)
            .ok_or(TablesError::UnknownGroup(group))?;
        if info.contains(index) {
            Ok(())
        } else {
            Err(TablesError::MemberOutOfRange {
                group,
                index,
                count: info.count,
                base: info.base,
            })
        }
    }

    /// Longest-prefix match of `addr` against the route table
    #[must_use]
    pub fn lookup_route(&self, addr: Ipv4Addr) -> Option<(&Ipv4Prefix, &RouteAction)> {
        self.routes.lookup(addr)
    }
    /// Exact match of a route
    #[must_use]
    pub fn get_route(&self, prefix: &Ipv4Prefix) -> Option<&RouteAction> {
        self.routes.get(prefix)
    }
    #[must_use]
    pub fn group(&self, group: EcmpGroupId) -> Option<&EcmpGroupInfo> {
        self.groups.get(&group)
    }
    #[must_use]
    pub fn member(&self, group: EcmpGroupId, index: u16) -> Option<&NextHop> {
        self.members.get(&(group, index))
    }
    #[must_use]
    pub fn alternate(&self, port: PortId) -> Option<&NextHop> {
        self.alternates.get(&port)
    }
    #[must_use]
    pub fn source_mac(&self, port: PortId) -> Option<Mac> {
        self.smacs.get(&port).copied()
    }

    pub fn routes(&self) -> impl Iterator<Item = (&Ipv4Prefix, &RouteAction)> {
        self.routes.iter()
    }
    /// ECMP groups, sorted by id
    #[must_use]
    pub fn groups(&self) -> Vec<(EcmpGroupId, EcmpGroupInfo)> {
        let mut groups: Vec<_> = self.groups.iter().map(|(g, i)| (*g, *i)).collect();
        groups.sort_by_key(|(g, _)| *g);
        groups
    }
    /// ECMP members, sorted by group and slot
    #[must_use]
    pub fn members(&self) -> Vec<((EcmpGroupId, u16), NextHop)> {
        let mut members: Vec<_> = self.members.iter().map(|(k, n)| (*k, *n)).collect();
        members.sort_by_key(|(k, _)| *k);
        members
    }
    /// Alternate next hops, sorted by primary port
    #[must_use]
    pub fn alternates(&self) -> Vec<(PortId, NextHop)> {
        let mut alternates: Vec<_> = self.alternates.iter().map(|(p, n)| (*p, *n)).collect();
        alternates.sort_by_key(|(p, _)| *p);
        alternates
    }
    /// Source MACs, sorted by port
    #[must_use]
    pub fn source_macs(&self) -> Vec<(PortId, Mac)> {
        let mut smacs: Vec<_> = self.smacs.iter().map(|(p, m)| (*p, *m)).collect();
        smacs.sort_by_key(|(p, _)| *p);
        smacs
    }

    #[must_use]
    pub fn len_routes(&self) -> usize {
        self.routes.len()
    }
    #[must_use]
    pub fn len_groups(&self) -> usize {
        self.groups.len()
    }
    #[must_use]
    pub fn len_members(&self) -> usize {
        self.members.len()
    }
    #[must_use]
    pub fn len_alternates(&self) -> usize {
        self.alternates.len()
    }
    #[must_use]
    pub fn len_source_macs(&self) -> usize {
        self.smacs.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
            && self.groups.is_empty()
            && self.members.is_empty()
            && self.alternates.is_empty()
            && self.smacs.is_empty()
    }
}
