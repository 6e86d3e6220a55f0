// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A forwarding worker: frames in, verdicts out

use net::ids::{NodeId, PortId};
use net::packet::{DoneReason, ForwardDecision, Packet, PacketDropStats};
use pipeline::{DynPipeline, NetworkFunction, PacketDumper};
use tracing::debug;

use crate::packet_processor::STAGE_DUMP;

/// The outcome of forwarding one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The frame, rewritten, leaves through `port`
    Forwarded {
        port: PortId,
        decision: ForwardDecision,
        frame: Vec<u8>,
    },
    Dropped(DoneReason),
}

impl Verdict {
    #[must_use]
    pub fn port(&self) -> Option<PortId> {
        match self {
            Verdict::Forwarded { port, .. } => Some(*port),
            Verdict::Dropped(_) => None,
        }
    }
    #[must_use]
    pub fn decision(&self) -> Option<ForwardDecision> {
        match self {
            Verdict::Forwarded { decision, .. } => Some(*decision),
            Verdict::Dropped(_) => None,
        }
    }
    #[must_use]
    pub fn reason(&self) -> DoneReason {
        match self {
            Verdict::Forwarded { .. } => DoneReason::Delivered,
            Verdict::Dropped(reason) => *reason,
        }
    }
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        matches!(self, Verdict::Dropped(_))
    }
}

/// Runs the pipeline of a node over frames and keeps account of why packets end.
pub struct ForwardingNode {
    name: NodeId,
    pipeline: DynPipeline,
    stats: PacketDropStats,
}

impl ForwardingNode {
    #[must_use]
    pub fn new(name: &NodeId, pipeline: DynPipeline) -> Self {
        Self {
            name: name.clone(),
            pipeline,
            stats: PacketDropStats::new(name.as_str()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &NodeId {
        &self.name
    }

    /// Packets seen by this worker, by outcome
    #[must_use]
    pub fn stats(&self) -> &PacketDropStats {
        &self.stats
    }

    #[must_use]
    pub fn dumper(&self) -> Option<&PacketDumper> {
        self.pipeline.get_stage_by_id::<PacketDumper>(STAGE_DUMP)
    }

    fn verdict(packet: Packet) -> Verdict {
        match packet.get_done() {
            Some(DoneReason::Delivered) => {
                let meta = packet.get_meta();
                match (meta.oif, meta.decision) {
                    (Some(port), Some(decision)) => Verdict::Forwarded {
                        port,
                        decision,
                        frame: packet.serialize(),
                    },
                    _ => Verdict::Dropped(DoneReason::InternalFailure),
                }
            }
            Some(reason) => Verdict::Dropped(reason),
            None => Verdict::Dropped(DoneReason::Unhandled),
        }
    }

    /// Forward a single frame
    pub fn forward(&mut self, frame: &[u8]) -> Verdict {
        let verdict = match Packet::parse(frame) {
            Ok(packet) => self
                .pipeline
                .process(std::iter::once(packet))
                .next()
                .map_or(Verdict::Dropped(DoneReason::Unhandled), Self::verdict),
            Err(e) => {
                debug!("{}: dropping frame: {e}", self.name);
                Verdict::Dropped(DoneReason::Malformed)
            }
        };
        self.stats.incr(verdict.reason(), 1);
        verdict
    }

    /// Forward frames in order, one verdict per frame
    pub fn forward_batch<'f>(&mut self, frames: impl IntoIterator<Item = &'f [u8]>) -> Vec<Verdict> {
        frames.into_iter().map(|frame| self.forward(frame)).collect()
    }
}
