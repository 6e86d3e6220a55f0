// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Management of adaptive ECMP nodes: the device clients to reach them, the translation
//! of a topology into their tables, the provisioning of those tables and thresholds, and
//! the monitoring of their counters.

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod cli;
pub mod device;
pub mod local;
pub mod monitor;
pub mod program;
pub mod provision;

pub use cli::SimpleSwitchCli;
pub use device::{DeviceClient, DeviceError, DeviceMap};
pub use local::LocalDevice;
pub use monitor::{CounterSample, Monitor};
pub use program::{FabricProgram, NodeProgram, ProgramSummary, Unrouted};
pub use provision::{ProvisionError, ProvisionReport, Provisioner};

use tracectl::trace_target;
trace_target!("mgmt", tracectl::LevelFilter::INFO, &["control-plane"]);
