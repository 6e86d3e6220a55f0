// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Match-action tables of an adaptive ECMP forwarder.
//!
//! A node owns one [`ForwardingTables`] behind a left-right pair: the control plane
//! changes it through a [`TablesWriter`] while every forwarding worker reads it without
//! locking through its own [`TablesReader`].

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

mod display;
pub mod hash;
pub mod tables;
pub mod tablesrw;

pub use hash::{ecmp_index, flow_hash};
pub use tables::{
    EcmpGroupId, EcmpGroupInfo, ForwardingTables, NextHop, RouteAction, TablesError,
};
pub use tablesrw::{TableChange, TablesReader, TablesWriter};

use tracectl::trace_target;
trace_target!("routing", tracectl::LevelFilter::INFO, &["control-plane"]);
