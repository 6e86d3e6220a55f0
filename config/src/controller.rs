// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Top-level configuration object for the controller

use crate::errors::{ConfigError, ConfigResult};
use crate::tracecfg::TracingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Threshold written to nodes unless configured otherwise, in bytes
pub const DEFAULT_THRESHOLD: u64 = 500_000;
/// Program driving a software switch over its management port
pub const DEFAULT_CLI_PATH: &str = "simple_switch_CLI";

fn default_poll_interval_ms() -> u64 {
    5000
}
fn default_reset_interval_ms() -> Option<u64> {
    Some(5000)
}

/// How often the monitor polls the counters of nodes, and how often it resets them
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `None` to never reset counters
    #[serde(default = "default_reset_interval_ms")]
    pub reset_interval_ms: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reset_interval_ms: default_reset_interval_ms(),
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    #[must_use]
    pub fn reset_interval(&self) -> Option<Duration> {
        self.reset_interval_ms.map(Duration::from_millis)
    }
    fn validate(&self) -> ConfigResult {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("monitor poll-interval-ms"));
        }
        if self.reset_interval_ms == Some(0) {
            return Err(ConfigError::ZeroValue("monitor reset-interval-ms"));
        }
        Ok(())
    }
}

/// Bounded exponential backoff for remote calls to nodes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the `retry`-th retry (starting at 1): the initial backoff doubled on
    /// every retry, capped at the max backoff.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    fn validate(&self) -> ConfigResult {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroValue("retry max-attempts"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::BackoffRange {
                initial: self.initial_backoff_ms,
                max: self.max_backoff_ms,
            });
        }
        Ok(())
    }
}

/// How to reach the nodes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Timeout of a single remote call
    pub timeout_ms: u64,
    pub cli_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            cli_path: DEFAULT_CLI_PATH.to_owned(),
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Everything the controller needs beyond the topology
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Bytes over which a port is considered loaded. `0` disables rerouting.
    pub threshold: u64,
    pub monitor: MonitorConfig,
    pub retry: RetryPolicy,
    pub device: DeviceConfig,
    pub tracing: TracingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            monitor: MonitorConfig::default(),
            retry: RetryPolicy::default(),
            device: DeviceConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse a config. Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// Fails if the document is not valid YAML or has unknown keys
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Read a config file
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        let config = Self::from_yaml(&yaml)?;
        info!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Render the config as YAML
    ///
    /// # Errors
    ///
    /// Fails if serialization fails
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml_ng::to_string(self).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Check the config for values that make no sense
    pub fn validate(&self) -> ConfigResult {
        debug!("Validating controller configuration..");
        self.monitor.validate()?;
        self.retry.validate()?;
        if self.device.timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("device timeout-ms"));
        }
        self.tracing.validate()
    }
}
