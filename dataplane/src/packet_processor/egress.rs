// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//
//! Implements an egress stage

use net::packet::{DoneReason, Packet};
use pipeline::NetworkFunction;
use routing::TablesReader;
use tracing::{debug, error, trace};

/// Rewrites the ethernet header for the port picked by forwarding and decrements the TTL.
pub struct Egress {
    name: String,
    tables: TablesReader,
}

impl Egress {
    #[must_use]
    pub fn new(name: &str, tables: TablesReader) -> Self {
        Self {
            name: name.to_owned(),
            tables,
        }
    }

    fn egress_packet(&self, packet: &mut Packet) {
        let nfi = &self.name;
        let meta = packet.get_meta();
        let (Some(oif), Some(dst_mac)) = (meta.oif, meta.nh_mac) else {
            debug!("{nfi}: no egress port for packet, dropping");
            packet.done(DoneReason::Unhandled);
            return;
        };
        let Some(tables) = self.tables.enter() else {
            error!("{nfi}: unable to read forwarding tables");
            packet.done(DoneReason::InternalFailure);
            return;
        };
        let src_mac = tables.source_mac(oif);
        drop(tables);

        if packet.ipv4_mut().decrement_ttl().is_none() {
            debug!("{nfi}: TTL exceeded for flow {}", packet.flow_key());
            packet.done(DoneReason::HopLimitExceeded);
            return;
        }
        let eth = packet.eth_mut();
        eth.set_destination(dst_mac);
        if let Some(src_mac) = src_mac {
            eth.set_source(src_mac);
        }
        trace!("{nfi}: packet can be sent over port {oif} to {dst_mac}");
        packet.done(DoneReason::Delivered);
    }
}

impl NetworkFunction for Egress {
    fn process<'a, Input: Iterator<Item = Packet> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet> + 'a {
        trace!("{}", self.name);
        input.map(move |mut packet| {
            if !packet.is_done() {
                self.egress_packet(&mut packet);
            }
            packet
        })
    }
}
