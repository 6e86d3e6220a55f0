// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The forwarding pipeline of an adaptive ECMP node.
//!
//! Packets are matched against the node's routes; packets of ECMP routes are spread over
//! the group members by flow hash, and steered to the member's alternate next hop when
//! the member's port carries more bytes than the node's threshold. The reroute decision is
//! taken for every packet, so a flow may move back and forth between its primary and
//! alternate next hop as the load of the primary port crosses the threshold.

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

mod node;
pub mod packet_processor;

pub use node::{ForwardingNode, Verdict};
pub use packet_processor::{NodeSetup, PipelineBuilder, start_node};

use tracectl::trace_target;
trace_target!("dataplane", tracectl::LevelFilter::INFO, &["pipeline"]);
