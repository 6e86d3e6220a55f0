// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::module_name_repetitions)]

//! A library for working with the frames seen by an adaptive ECMP forwarder

pub mod eth;
pub mod flow;
pub mod ids;
pub mod ipv4;
pub mod packet;
pub mod parse;
pub mod transport;

use tracectl::trace_target;
trace_target!("net", tracectl::LevelFilter::INFO, &["pipeline"]);
