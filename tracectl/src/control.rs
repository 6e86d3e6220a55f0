// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of logging levels.

use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

use crate::LevelFilter;
use crate::display::TargetCfgDbByTag;
use crate::targets::DECLARED_TARGETS;
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TraceCtlError {
    #[error("Invalid syntax '{0}': it should be tag=level")]
    Syntax(String),
    #[error("Invalid level '{0}'")]
    Level(String),
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
}

#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
}
impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        // a target can always be addressed by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, BTreeSet<&'static str>>,
}

impl TargetCfgDb {
    pub(crate) fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for target in DECLARED_TARGETS.iter() {
            db.register(target.target, target.name, target.default_level, target.tags);
        }
        db
    }
    pub(crate) fn register(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) {
        let tconfig = TargetCfg::new(target, name, level, tags);
        for tag in &tconfig.tags {
            self.tags.entry(*tag).or_default().insert(target);
        }
        if let Some(exist) = self.targets.insert(target, tconfig) {
            warn!("Target {} has been multiply defined!", exist.target);
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            let directive = format!("{}={}", target.target, target.level);
            match directive.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Ignoring bad directive '{directive}': {e}"),
            }
        }
        filter
    }
    fn tag_targets_mut(&mut self, tag: &str) -> Vec<&mut TargetCfg> {
        let Some(members) = self.tags.get(tag) else {
            return vec![];
        };
        self.targets
            .values_mut()
            .filter(|t| members.contains(t.target))
            .collect()
    }
    fn tag_targets(&self, tag: &str) -> Vec<&TargetCfg> {
        let Some(members) = self.tags.get(tag) else {
            return vec![];
        };
        self.targets
            .values()
            .filter(|t| members.contains(t.target))
            .collect()
    }
}

pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: Option<reload::Handle<EnvFilter, Registry>>,
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        // another subscriber may already be installed (e.g. by a test harness)
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_ok();

        Self {
            db: Mutex::new(db),
            reload_filter: installed.then_some(reload_filter),
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn reload(&self, db: &TargetCfgDb) {
        if let Some(handle) = &self.reload_filter
            && let Err(e) = handle.reload(db.env_filter())
        {
            warn!("Failed to reload tracing filter: {e}");
        }
    }

    /// Parse a string made of comma-separated `tag=level` items.
    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut result = OrderMap::new();
        for item in input.split(',').map(str::trim) {
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceCtlError::Syntax(item.to_owned()));
            };
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| TraceCtlError::Level(level.trim().to_owned()))?;
            result.insert(tag.trim().to_owned(), level);
        }
        Ok(result)
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get a reference to the process-wide [`TracingControl`], initializing it if needed
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of all the targets carrying `tag`. Returns the number of targets changed.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> usize {
        let mut db = self.db();
        let mut changed = 0;
        for target in db.tag_targets_mut(tag) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        if changed > 0 {
            self.reload(&db);
        }
        info!("Log level for tag '{tag}' set to {level}; targets changed: {changed}");
        changed
    }

    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(&db);
    }

    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            self.reload(&db);
        }
    }

    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db().level
    }

    /// Apply a configuration like `default=warn,all=info,dataplane=debug`.
    ///
    /// `default` sets the level for targets that were never declared; `all` sets every
    /// declared target; any other key is a tag. Later keys override earlier ones.
    ///
    /// # Errors
    ///
    /// Fails on bad syntax, an unknown level or a tag that no target carries. Nothing is
    /// changed if the input is invalid.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_tracing_config(input)?;
        {
            let db = self.db();
            if let Some(tag) = config
                .keys()
                .map(String::as_str)
                .find(|k| *k != "default" && *k != "all" && !db.tags.contains_key(*k))
            {
                return Err(TraceCtlError::UnknownTag(tag.to_owned()));
            }
        }
        for (tag, level) in &config {
            match tag.as_str() {
                "default" => self.set_default_level(*level),
                "all" => self.set_level_all(*level),
                tag => {
                    self.set_tag_level(tag, *level);
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    #[must_use]
    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.db().tag_targets(tag).into_iter().cloned().collect()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.db().tags.contains_key(tag)
    }

    pub fn dump_targets_by_tag(&self) {
        let db = self.db();
        info!("{}", TargetCfgDbByTag(&db));
    }

    pub fn dump(&self) {
        let db = self.db();
        info!("{db}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::control::{TraceCtlError, get_trace_ctl};
    use crate::targets::DECLARED_TARGETS;
    use crate::{LevelFilter, custom_target};

    #[test]
    fn targets_are_collected_at_link_time() {
        custom_target!("late-target", LevelFilter::OFF, &[]);
        let static_targets: Vec<&str> = DECLARED_TARGETS.iter().map(|t| t.target).collect();
        assert!(static_targets.contains(&"adaptive_tracectl::control"));
        assert!(static_targets.contains(&"late-target"));
        assert!(get_trace_ctl().get_target("late-target").is_some());
    }

    #[test]
    fn tag_level_applies_to_all_members() {
        const TAG: &str = "test-shared-tag";
        custom_target!("test-t1", LevelFilter::DEBUG, &[TAG]);
        custom_target!("test-t2", LevelFilter::ERROR, &[TAG]);

        let tctl = get_trace_ctl();
        assert_eq!(tctl.get_targets_by_tag(TAG).len(), 2);
        tctl.set_tag_level(TAG, LevelFilter::OFF);
        assert_eq!(tctl.get_target("test-t1").unwrap().level(), LevelFilter::OFF);
        assert_eq!(tctl.get_target("test-t2").unwrap().level(), LevelFilter::OFF);
    }

    #[test]
    fn setup_from_string() {
        custom_target!("test-from-string", LevelFilter::INFO, &["test-str-tag"]);
        let tctl = get_trace_ctl();

        tctl.setup_from_string("test-str-tag=warn").unwrap();
        assert_eq!(
            tctl.get_target("test-from-string").unwrap().level(),
            LevelFilter::WARN
        );

        assert_eq!(
            tctl.setup_from_string("test-str-tag=loud"),
            Err(TraceCtlError::Level("loud".to_owned()))
        );
        assert!(matches!(
            tctl.setup_from_string("test-str-tag=error, foo"),
            Err(TraceCtlError::Syntax(_))
        ));
        assert!(matches!(
            tctl.setup_from_string("no-such-tag=error"),
            Err(TraceCtlError::UnknownTag(_))
        ));
        // invalid input leaves levels untouched
        assert_eq!(
            tctl.get_target("test-from-string").unwrap().level(),
            LevelFilter::WARN
        );
    }
}
