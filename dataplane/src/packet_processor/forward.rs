// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//
//! Implements the adaptive ECMP forwarding stage

use concurrency::sync::Arc;
use counters::PortCounters;
use net::packet::{DoneReason, ForwardDecision, Packet};
use pipeline::NetworkFunction;
use routing::{EcmpGroupId, ForwardingTables, NextHop, RouteAction, TablesReader, ecmp_index};
use tracing::{debug, error, trace};

/// Picks the egress of a packet: longest-prefix match, then, for ECMP routes, a member by
/// flow hash, replaced by its alternate while the member's port is above threshold.
pub struct AdaptiveForwarder {
    name: String,
    tables: TablesReader,
    counters: Arc<PortCounters>,
}

impl AdaptiveForwarder {
    /// Build a forwarding stage reading the given tables and accounting load on `counters`
    #[must_use]
    pub fn new(name: &str, tables: TablesReader, counters: Arc<PortCounters>) -> Self {
        Self {
            name: name.to_owned(),
            tables,
            counters,
        }
    }

    fn set_egress(packet: &mut Packet, nhop: &NextHop, decision: ForwardDecision) {
        let meta = packet.get_meta_mut();
        meta.oif = Some(nhop.port);
        meta.nh_mac = Some(nhop.mac);
        meta.decision = Some(decision);
    }

    /// Resolve an ECMP group to a member, possibly rerouting to its alternate
    fn forward_ecmp(
        &self,
        packet: &mut Packet,
        tables: &ForwardingTables,
        group: EcmpGroupId,
    ) {
        let nfi = &self.name;
        let Some(info) = tables.group(group) else {
            debug!("{nfi}: ECMP group {group} is not installed");
            packet.done(DoneReason::EcmpGroupMiss);
            return;
        };
        let flow = packet.flow_key();
        let Some(index) = ecmp_index(&flow, info) else {
            debug!("{nfi}: ECMP group {group} has no members");
            packet.done(DoneReason::EcmpMemberMiss);
            return;
        };
        let Some(primary) = tables.member(group, index) else {
            debug!("{nfi}: no member {index} in ECMP group {group}");
            packet.done(DoneReason::EcmpMemberMiss);
            return;
        };

        let load = self.counters.get(primary.port);
        let threshold = self.counters.threshold();
        let (selected, decision) = if threshold.exceeded_by(load)
            && let Some(alternate) = tables.alternate(primary.port)
        {
            debug!(
                "{nfi}: port {} carries {load} bytes (threshold {threshold}), flow {flow} rerouted to {alternate}",
                primary.port
            );
            (alternate, ForwardDecision::EcmpRerouted)
        } else {
            (primary, ForwardDecision::EcmpPrimary)
        };
        trace!("{nfi}: flow {flow} -> slot {index} of group {group}: {selected}");

        let len = u64::try_from(packet.wire_len()).unwrap_or(u64::MAX);
        self.counters.add(selected.port, len);
        Self::set_egress(packet, selected, decision);
    }

    fn forward_packet(&self, packet: &mut Packet) {
        let nfi = &self.name;
        let Some(tables) = self.tables.enter() else {
            error!("{nfi}: unable to read forwarding tables");
            packet.done(DoneReason::InternalFailure);
            return;
        };
        let dst = packet.ipv4().destination();
        let Some((prefix, action)) = tables.lookup_route(dst) else {
            debug!("{nfi}: no route to {dst}");
            packet.done(DoneReason::RouteFailure);
            return;
        };
        trace!("{nfi}: {dst} hit {prefix}: {action}");
        match *action {
            RouteAction::Forward(nhop) => Self::set_egress(packet, &nhop, ForwardDecision::Direct),
            RouteAction::Ecmp(group) => self.forward_ecmp(packet, &tables, group),
            RouteAction::Drop => packet.done(DoneReason::RouteDrop),
        }
    }
}

impl NetworkFunction for AdaptiveForwarder {
    fn process<'a, Input: Iterator<Item = Packet> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet> + 'a {
        trace!("{}", self.name);
        input.map(move |mut packet| {
            if !packet.is_done() {
                self.forward_packet(&mut packet);
            }
            packet
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use counters::Threshold;
    use lpm::prefix::Ipv4Prefix;
    use net::eth::mac::Mac;
    use net::ids::PortId;
    use net::packet::test_utils::{udp_frame, unknown_transport_frame};
    use pretty_assertions::assert_eq;
    use routing::{EcmpGroupInfo, TablesWriter};

    const GROUP: EcmpGroupId = EcmpGroupId::new(1);

    fn nhop(port: u16) -> NextHop {
        NextHop::new(PortId::new(port), Mac([0, 0, 9, 0, 0, u8::try_from(port).unwrap()]))
    }

    /// Tables with a direct route, a two-member ECMP route and alternates 2 <-> 3
    fn setup() -> (TablesWriter, Arc<PortCounters>) {
        let (mut writer, _) = TablesWriter::new();
        let prefix = |s: &str| s.parse::<Ipv4Prefix>().unwrap();
        writer.add_route(prefix("10.0.1.0/24"), RouteAction::Forward(nhop(1)), false);
        writer.add_route(prefix("10.0.2.0/24"), RouteAction::Ecmp(GROUP), false);
        writer.add_route(prefix("10.0.3.0/24"), RouteAction::Drop, false);
        writer.add_route(prefix("10.0.4.0/24"), RouteAction::Ecmp(EcmpGroupId::new(9)), false);
        writer.add_group(GROUP, EcmpGroupInfo::new(2, 0), false);
        writer.add_member(GROUP, 0, nhop(2), false);
        writer.add_member(GROUP, 1, nhop(3), false);
        writer.add_alternate(PortId::new(2), nhop(3), false);
        writer.add_alternate(PortId::new(3), nhop(2), true);
        (writer, Arc::new(PortCounters::new(8)))
    }

    fn run(nf: &mut AdaptiveForwarder, frame: &[u8]) -> Packet {
        let packet = Packet::parse(frame).unwrap();
        let mut out: Vec<_> = nf.process(std::iter::once(packet)).collect();
        out.pop().unwrap()
    }

    fn forwarder(writer: &TablesWriter, counters: &Arc<PortCounters>) -> AdaptiveForwarder {
        AdaptiveForwarder::new("forward", writer.as_tables_reader(), counters.clone())
    }

    #[test]
    fn direct_route_leaves_counters_alone() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.1.7", 1000, 53, 100));
        assert_eq!(packet.get_meta().oif, Some(PortId::new(1)));
        assert_eq!(packet.get_meta().nh_mac, Some(nhop(1).mac));
        assert_eq!(packet.get_meta().decision, Some(ForwardDecision::Direct));
        assert!(counters.snapshot().iter().all(|c| *c == 0));
    }

    #[test]
    fn unmatched_and_drop_routes() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "192.168.1.1", 1, 2, 0));
        assert_eq!(packet.get_done(), Some(DoneReason::RouteFailure));
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.3.1", 1, 2, 0));
        assert_eq!(packet.get_done(), Some(DoneReason::RouteDrop));
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.4.1", 1, 2, 0));
        assert_eq!(packet.get_done(), Some(DoneReason::EcmpGroupMiss));
    }

    #[test]
    fn counter_sums_packet_sizes() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let mut expected = 0u64;
        let mut port = None;
        for size in [10usize, 200, 1000, 64] {
            let frame = udp_frame("10.0.9.1", "10.0.2.1", 4000, 80, size);
            expected += u64::try_from(frame.len()).unwrap();
            let packet = run(&mut nf, &frame);
            assert_eq!(packet.get_meta().decision, Some(ForwardDecision::EcmpPrimary));
            let oif = packet.get_meta().oif.unwrap();
            assert_eq!(*port.get_or_insert(oif), oif);
        }
        let port = port.unwrap();
        assert_eq!(counters.get(port), expected);
        assert_eq!(counters.snapshot().iter().sum::<u64>(), expected);
    }

    #[test]
    fn overloaded_member_rerouted_to_alternate() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let frame = udp_frame("10.0.9.1", "10.0.2.1", 4000, 80, 100);
        let len = u64::try_from(frame.len()).unwrap();
        let primary = run(&mut nf, &frame).get_meta().oif.unwrap();
        let alternate = writer.enter().unwrap().alternate(primary).unwrap().port;

        counters.set_threshold(Threshold::from(2_000_000));
        counters.reset();
        counters.add(primary, 3_000_000);

        let packet = run(&mut nf, &frame);
        assert_eq!(packet.get_meta().oif, Some(alternate));
        assert_eq!(packet.get_meta().decision, Some(ForwardDecision::EcmpRerouted));
        // only the port finally used is accounted
        assert_eq!(counters.get(primary), 3_000_000);
        assert_eq!(counters.get(alternate), len);

        // after a reset the member is used again
        counters.reset();
        let packet = run(&mut nf, &frame);
        assert_eq!(packet.get_meta().oif, Some(primary));
        assert_eq!(counters.get(primary), len);
    }

    #[test]
    fn threshold_not_exceeded_when_equal() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let frame = udp_frame("10.0.9.1", "10.0.2.1", 4000, 80, 0);
        let primary = run(&mut nf, &frame).get_meta().oif.unwrap();
        counters.reset();
        counters.set_threshold(Threshold::from(1000));
        counters.add(primary, 1000);
        assert_eq!(run(&mut nf, &frame).get_meta().oif, Some(primary));
    }

    #[test]
    fn disabled_threshold_never_reroutes() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        counters.set_threshold(Threshold::Disabled);
        counters.add(PortId::new(2), u64::MAX);
        counters.add(PortId::new(3), u64::MAX);
        for sport in 0..64 {
            let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.2.1", sport, 80, 0));
            assert_eq!(packet.get_meta().decision, Some(ForwardDecision::EcmpPrimary));
        }
    }

    #[test]
    fn missing_alternate_falls_back_to_primary() {
        let (mut writer, counters) = setup();
        writer.clear(false);
        writer.add_route("10.0.2.0/24".parse().unwrap(), RouteAction::Ecmp(GROUP), false);
        writer.add_group(GROUP, EcmpGroupInfo::new(2, 0), false);
        writer.add_member(GROUP, 0, nhop(2), false);
        writer.add_member(GROUP, 1, nhop(3), true);
        let mut nf = forwarder(&writer, &counters);
        counters.set_threshold(Threshold::from(1));
        counters.add(PortId::new(2), 10);
        counters.add(PortId::new(3), 10);
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.2.1", 5, 6, 0));
        assert!(!packet.is_done());
        assert_eq!(packet.get_meta().decision, Some(ForwardDecision::EcmpPrimary));
    }

    #[test]
    fn missing_member_drops() {
        let (mut writer, counters) = setup();
        writer.add_group(GROUP, EcmpGroupInfo::new(4, 0), true);
        let mut nf = forwarder(&writer, &counters);
        let mut reasons = std::collections::BTreeSet::new();
        for sport in 0..64 {
            let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.2.1", sport, 80, 0));
            reasons.insert(packet.get_done());
        }
        assert!(reasons.contains(&Some(DoneReason::EcmpMemberMiss)));
        assert!(reasons.contains(&None));
    }

    #[test]
    fn unknown_transport_is_hashed_with_zero_ports() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        let a = run(&mut nf, &unknown_transport_frame("10.0.9.1", "10.0.2.1", 47, 40));
        let b = run(&mut nf, &unknown_transport_frame("10.0.9.1", "10.0.2.1", 47, 400));
        assert_eq!(a.flow_key().src_port, 0);
        assert!(a.get_meta().oif.is_some());
        assert_eq!(a.get_meta().oif, b.get_meta().oif);
    }

    #[test]
    fn tables_gone_is_internal_failure() {
        let (writer, counters) = setup();
        let mut nf = forwarder(&writer, &counters);
        drop(writer);
        let packet = run(&mut nf, &udp_frame("10.0.9.1", "10.0.1.1", 1, 2, 0));
        assert_eq!(packet.get_done(), Some(DoneReason::InternalFailure));
    }
}
