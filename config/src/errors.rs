// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures
//! Any result returned by the validation methods in this crate is a `ConfigError`.

use thiserror::Error;
use tracectl::TraceCtlError;

/// The reasons why we may reject a configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(String, String),
    #[error("Invalid config: {0}")]
    Yaml(String),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("Initial backoff ({initial} ms) is larger than max backoff ({max} ms)")]
    BackoffRange { initial: u64, max: u64 },
    #[error("Bad tracing config: {0}")]
    Tracing(#[from] TraceCtlError),
}

/// Result-like type for configurations
pub type ConfigResult = Result<(), ConfigError>;
