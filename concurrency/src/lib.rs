// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Synchronization facade.
//!
//! Shared state touched by forwarding workers (port counters, thresholds) imports its
//! atomics and locks from here rather than from `std::sync` so that the same code can be
//! model-checked with `loom` by enabling the `loom` feature.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

#[cfg(not(feature = "loom"))]
pub use std::sync;

#[cfg(feature = "loom")]
pub use loom::sync;

/// Run `f` under the loom model checker when the `loom` feature is on, or just once otherwise.
pub fn model<F>(f: F)
where
    F: Fn() + Sync + Send + 'static,
{
    #[cfg(feature = "loom")]
    loom::model(f);

    #[cfg(not(feature = "loom"))]
    f();
}

#[cfg(not(feature = "loom"))]
pub use std::thread;

#[cfg(feature = "loom")]
pub use loom::thread;
