// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::eth::mac::Mac;
use crate::ids::PortId;
use std::collections::HashMap;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum DoneReason {
    InternalFailure,  /* catch-all for internal issues */
    Malformed,        /* the frame does not carry a parseable IPv4 header */
    RouteFailure,     /* no route matches the destination */
    RouteDrop,        /* routing explicitly requests pkts to be dropped */
    EcmpGroupMiss,    /* route points to an ECMP group that is not installed */
    EcmpMemberMiss,   /* no member for the computed hash slot */
    HopLimitExceeded, /* TTL would reach zero */
    Unhandled,        /* no stage took a decision for the packet */
    Delivered,        /* the packet was handed to its egress port */
}

impl Display for DoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DoneReason::InternalFailure => "internal-failure",
            DoneReason::Malformed => "malformed",
            DoneReason::RouteFailure => "route-failure",
            DoneReason::RouteDrop => "route-drop",
            DoneReason::EcmpGroupMiss => "ecmp-group-miss",
            DoneReason::EcmpMemberMiss => "ecmp-member-miss",
            DoneReason::HopLimitExceeded => "hop-limit-exceeded",
            DoneReason::Unhandled => "unhandled",
            DoneReason::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// How the egress of a packet was chosen
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ForwardDecision {
    /// Single next hop route: counters are not touched
    Direct,
    /// ECMP member picked by the flow hash
    EcmpPrimary,
    /// The hashed member was over threshold and its alternate was used
    EcmpRerouted,
}

#[derive(Debug, Default, Clone)]
pub struct PacketMeta {
    pub oif: Option<PortId>,              /* outgoing port - set by forwarding */
    pub nh_mac: Option<Mac>,              /* link-layer address of next-hop */
    pub decision: Option<ForwardDecision>, /* how oif was selected */
    pub done: Option<DoneReason>, /* if Some, the reason why a packet was marked as done, including delivery */

    #[cfg(any(test, feature = "testing"))]
    /* Keep the Packet in spite of calling packet.enforce(). This is for testing */
    pub keep: bool,
}

impl PacketMeta {
    #[must_use]
    pub fn keep(&self) -> bool {
        #[cfg(any(test, feature = "testing"))]
        {
            self.keep
        }
        #[cfg(not(any(test, feature = "testing")))]
        {
            false
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct PacketDropStats {
    pub name: String,
    reasons: HashMap<DoneReason, u64>,
}

impl PacketDropStats {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            reasons: HashMap::default(),
        }
    }
    pub fn incr(&mut self, reason: DoneReason, value: u64) {
        self.reasons
            .entry(reason)
            .and_modify(|counter| *counter = counter.saturating_add(value))
            .or_insert(value);
    }
    #[must_use]
    pub fn get_stat(&self, reason: DoneReason) -> Option<u64> {
        self.reasons.get(&reason).copied()
    }
    #[must_use]
    pub fn get_stats(&self) -> &HashMap<DoneReason, u64> {
        &self.reasons
    }
    /// Total of packets dropped, i.e. done for a reason other than delivery
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.reasons
            .iter()
            .filter(|(reason, _)| **reason != DoneReason::Delivered)
            .map(|(_, count)| *count)
            .sum()
    }
}
