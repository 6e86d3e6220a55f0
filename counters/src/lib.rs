// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-node, per-port byte counters and the load threshold they are compared against.
//!
//! Counters are 64 bits wide and saturate at [`u64::MAX`]. An update is a relaxed load
//! followed by a relaxed store, so concurrent updates to the same port may be lost: the
//! counters are an approximate load signal, not accounting.

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod port;
mod store;
mod threshold;

pub use port::{DEFAULT_PORT_COUNT, PortCounters};
pub use store::{CounterError, CounterRegistry, CounterStore};
pub use threshold::Threshold;

use tracectl::trace_target;
trace_target!("counters", tracectl::LevelFilter::INFO, &["pipeline"]);
