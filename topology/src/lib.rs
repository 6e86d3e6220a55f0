// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Topology model of the forwarding fabric and shortest-path computation over it.

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::module_name_repetitions)]

mod model;
pub mod samples;
pub mod spf;

pub use model::{Adjacency, HostAttachment, Link, Node, Topology, TopologyError};
pub use spf::{Hop, Path, Reachability, Spt, compute_all, compute_spt, equal_cost_paths};

use tracectl::trace_target;
trace_target!("topology", tracectl::LevelFilter::INFO, &["control-plane"]);
