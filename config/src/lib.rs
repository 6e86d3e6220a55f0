// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the adaptive ECMP controller: the load threshold written to nodes,
//! the cadence of the counter monitor, the retry policy of remote calls and how nodes
//! are reached. Every field has a default, so an empty document is a valid config.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod controller;
pub mod errors;
pub mod tracecfg;

pub use controller::{
    ControllerConfig, DEFAULT_CLI_PATH, DEFAULT_THRESHOLD, DeviceConfig, MonitorConfig,
    RetryPolicy,
}; // re-export
pub use errors::{ConfigError, ConfigResult}; // re-export
pub use tracecfg::TracingConfig; // re-export

use tracectl::trace_target;
trace_target!("config", tracectl::LevelFilter::INFO, &["control-plane"]);
