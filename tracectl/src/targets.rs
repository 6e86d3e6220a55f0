// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Logging targets declared across the workspace.
//!
//! Each crate contributes one entry with [`trace_target!`](crate::trace_target) at module
//! level. Entries land in [`DECLARED_TARGETS`] at link time, so the binary knows every
//! target before any of them logs.

use crate::LevelFilter;
use linkme::distributed_slice;

/// A target as declared: the string `tracing` filters on, a short name for humans,
/// the level it starts at and the tags it can be driven by.
pub struct TargetDecl {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) default_level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

impl TargetDecl {
    #[must_use]
    pub const fn new(
        target: &'static str,
        name: &'static str,
        default_level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            default_level,
            tags,
        }
    }
}

#[distributed_slice]
pub static DECLARED_TARGETS: [TargetDecl];

/// Declare the target of the calling crate, named `$name`, starting at `$level`.
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            #[::linkme::distributed_slice($crate::targets::DECLARED_TARGETS)]
            static DECLARED: $crate::targets::TargetDecl =
                $crate::targets::TargetDecl::new(module_path!(), $name, $level, $tags);
        };
    };
}

/// Declare a target by its literal string, for crates that do not declare their own.
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            #[::linkme::distributed_slice($crate::targets::DECLARED_TARGETS)]
            static DECLARED: $crate::targets::TargetDecl =
                $crate::targets::TargetDecl::new($target, $target, $level, $tags);
        };
    };
}
