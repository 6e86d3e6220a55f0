// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tables printed by `--show-tracing-targets` and the tag dump

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::{Display, Formatter, Result};

const NAME_WIDTH: usize = 14;
const TARGET_WIDTH: usize = 40;

fn row(f: &mut Formatter<'_>, name: &str, target: &str, level: &str, tags: &str) -> Result {
    write!(
        f,
        "{name:<NAME_WIDTH$} {target:<TARGET_WIDTH$} {level:<6} {tags}"
    )
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        // the name is always one of the tags, only list the others
        let tags: Vec<&str> = self
            .tags
            .iter()
            .copied()
            .filter(|t| *t != self.name)
            .collect();
        row(
            f,
            self.name,
            self.target,
            &self.level.to_string(),
            &tags.join(","),
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f)?;
        row(f, "NAME", "TARGET", "LEVEL", "TAGS")?;
        writeln!(f)?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(f, "targets not listed log at {}", self.level)
    }
}

pub(crate) struct TargetCfgDbByTag<'a>(pub(crate) &'a TargetCfgDb);

impl Display for TargetCfgDbByTag<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for (tag, members) in &self.0.tags {
            let levels: Vec<String> = self
                .0
                .targets
                .values()
                .filter(|t| members.contains(t.target))
                .map(|t| format!("{}={}", t.name, t.level))
                .collect();
            writeln!(f)?;
            write!(f, "[{tag}] {}", levels.join(" "))?;
        }
        Ok(())
    }
}
