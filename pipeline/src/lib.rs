// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(rustdoc::private_doc_tests)]
#![deny(
    unsafe_code,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

//! # Forwarding pipelines
//!
//! A node forwards packets by running them through a sequence of stages, each one a
//! [`NetworkFunction`]. A [`DynPipeline`] holds the stages of a node under names, runs
//! them in insertion order, and hands a stage back by name and concrete type so that it
//! can be inspected or reconfigured while the node runs.
//!
//! ```rust
//! use adaptive_pipeline::{DynPipeline, NetworkFunction, PacketDumper};
//! use net::packet::Packet;
//! use net::packet::test_utils::udp_frame;
//!
//! let mut pipeline = DynPipeline::new();
//! pipeline
//!     .add_stage_with_id("dump", PacketDumper::new("dump", true, None))
//!     .unwrap();
//!
//! let packet = Packet::parse(&udp_frame("10.0.0.1", "10.0.0.2", 1, 2, 0)).unwrap();
//! assert_eq!(pipeline.process(std::iter::once(packet)).count(), 1);
//! assert_eq!(pipeline.get_stage_by_id::<PacketDumper>("dump").unwrap().count(), 1);
//! ```

mod dumper;
mod dyn_nf;
mod nf;
mod pipeline;

pub use dumper::{DumperFilter, PacketDumper};
pub use nf::NetworkFunction;
pub use pipeline::{DynPipeline, PipelineError, StageId};

use tracectl::trace_target;
trace_target!("pipeline", tracectl::LevelFilter::INFO, &["pipeline"]);
