// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Controller tracing configuration

use crate::ConfigResult;
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracectl::{LevelFilter, TraceCtlError, get_trace_ctl};
use tracing::debug;

/// Log levels by tag. The keys `default` and `all` have the meaning they have for
/// [`tracectl::TracingControl::setup_from_string`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TracingConfig {
    pub tags: OrderMap<String, String>,
}

impl TracingConfig {
    pub fn add_tag(&mut self, tag: &str, level: LevelFilter) {
        let _ = self.tags.insert(tag.to_string(), level.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The `tag=level,...` form of this config
    #[must_use]
    pub fn as_setup_string(&self) -> String {
        self.tags
            .iter()
            .map(|(tag, level)| format!("{tag}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating tracing configuration..");
        let tctl = get_trace_ctl();
        for (tag, level) in &self.tags {
            LevelFilter::from_str(level).map_err(|_| TraceCtlError::Level(level.clone()))?;
            if tag != "default" && tag != "all" && !tctl.has_tag(tag) {
                return Err(TraceCtlError::UnknownTag(tag.clone()).into());
            }
        }
        Ok(())
    }

    /// Apply the levels to the process-wide tracing control
    pub fn apply(&self) -> ConfigResult {
        if self.is_empty() {
            return Ok(());
        }
        get_trace_ctl().setup_from_string(&self.as_setup_string())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn setup_string_keeps_order() {
        let mut cfg = TracingConfig::default();
        cfg.add_tag("default", LevelFilter::WARN);
        cfg.add_tag("config", LevelFilter::DEBUG);
        assert_eq!(cfg.as_setup_string(), "default=warn,config=debug");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_tags_and_levels() {
        let mut cfg = TracingConfig::default();
        cfg.tags.insert("config".to_owned(), "chatty".to_owned());
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Tracing(TraceCtlError::Level("chatty".to_owned())))
        );
        let mut cfg = TracingConfig::default();
        cfg.add_tag("no-such-tag-anywhere", LevelFilter::INFO);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Tracing(TraceCtlError::UnknownTag(_)))
        ));
    }

    #[test]
    fn apply_sets_levels() {
        let mut cfg = TracingConfig::default();
        cfg.add_tag("config", LevelFilter::TRACE);
        cfg.apply().unwrap();
        let targets = get_trace_ctl().get_targets_by_tag("config");
        assert!(!targets.is_empty());
        assert!(targets.iter().all(|t| t.level() == LevelFilter::TRACE));
    }
}
