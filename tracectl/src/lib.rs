// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Logging targets and their levels.
//!
//! Every crate of the workspace declares its target with [`trace_target!`] and the tags it
//! answers to: `pipeline` for the forwarding path of a node, `control-plane` for path
//! computation, provisioning and monitoring. [`TracingControl`] installs the subscriber and
//! changes levels at runtime, per target name, per tag or for everything at once.

pub mod control;
mod display;
pub mod targets;

pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing::level_filters::LevelFilter;
