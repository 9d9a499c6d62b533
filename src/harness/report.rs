/*
** Copyright (C) 2026 Sylvain Fargier
**
** This software is provided 'as-is', without any express or implied
** warranty.  In no event will the authors be held liable for any damages
** arising from the use of this software.
**
** Permission is granted to anyone to use this software for any purpose,
** including commercial applications, and to alter it and redistribute it
** freely, subject to the following restrictions:
**
** 1. The origin of this software must not be misrepresented; you must not
**    claim that you wrote the original software. If you use this software
**    in a product, an acknowledgment in the product documentation would be
**    appreciated but is not required.
** 2. Altered source versions must be plainly marked as such, and must not be
**    misrepresented as being the original software.
** 3. This notice may not be removed or altered from any source distribution.
**
** Created on: 2026-10-19T14:32:50
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use colored::Colorize;
use serde::Serialize;
use std::time::Duration;
use tabled::{Tabled, derive::display};

use crate::{
    registry::{Address, InstanceId, Kind, Stats},
    utils::{IS_OUT_COLORED, tabled::TDisplay},
};

pub fn kind_str(kind: &Kind) -> String {
    let str = kind.to_string();
    if *IS_OUT_COLORED {
        if kind.is_thread_safe() {
            str.green().to_string()
        } else {
            str.red().to_string()
        }
    } else {
        str
    }
}

fn identities_str(identities: &usize) -> String {
    let str = identities.to_string();
    if *IS_OUT_COLORED && *identities > 1 {
        str.red().bold().to_string()
    } else {
        str
    }
}

/// Strategy description, for listing
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StrategyInfo {
    #[tabled(display("kind_str"))]
    pub name: Kind,
    #[tabled(display("TDisplay::to_cell"), rename = "thread-safe")]
    pub thread_safe: bool,
    #[tabled(display("TDisplay::to_cell"))]
    pub teardown: bool,
    pub description: &'static str,
}

impl From<Kind> for StrategyInfo {
    fn from(kind: Kind) -> Self {
        Self {
            name: kind,
            thread_safe: kind.is_thread_safe(),
            teardown: kind.has_teardown(),
            description: kind.description(),
        }
    }
}

/// Outcome of concurrent callers on a single registry
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct TrialReport {
    pub trial: usize,
    /// distinct instances observed by callers
    #[tabled(display("identities_str"))]
    pub identities: usize,
    pub constructed: usize,
    pub leaked: usize,
    pub failures: usize,
    #[serde(with = "humantime_serde")]
    #[tabled(display("TDisplay::to_cell"))]
    pub elapsed: Duration,
    #[tabled(skip)]
    pub ids: Vec<InstanceId>,
}

impl TrialReport {
    pub fn new(trial: usize, ids: Vec<InstanceId>, stats: &Stats, failures: usize) -> Self {
        Self {
            trial,
            identities: ids.len(),
            constructed: stats.constructed,
            leaked: stats.leaked,
            failures,
            elapsed: Duration::ZERO,
            ids,
        }
    }

    /// More than one instance was observed
    pub fn is_race(&self) -> bool {
        self.identities > 1
    }
}

/// Summary over all trials of a strategy
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct Report {
    #[tabled(display("kind_str"))]
    pub strategy: Kind,
    pub threads: usize,
    pub trials: usize,
    /// trials where more than one instance was observed
    pub races: usize,
    #[tabled(rename = "max identities")]
    pub max_identities: usize,
    pub constructed: usize,
    pub leaked: usize,
    pub failures: usize,
    #[serde(with = "humantime_serde")]
    #[tabled(display("TDisplay::to_cell"))]
    pub elapsed: Duration,
    #[tabled(skip)]
    pub details: Vec<TrialReport>,
}

impl Report {
    pub fn new(strategy: Kind, threads: usize, details: Vec<TrialReport>) -> Self {
        Self {
            strategy,
            threads,
            trials: details.len(),
            races: details.iter().filter(|t| t.is_race()).count(),
            max_identities: details.iter().map(|t| t.identities).max().unwrap_or(0),
            constructed: details.iter().map(|t| t.constructed).sum(),
            leaked: details.iter().map(|t| t.leaked).sum(),
            failures: details.iter().map(|t| t.failures).sum(),
            elapsed: details.iter().map(|t| t.elapsed).sum(),
            details,
        }
    }

    /// Every trial observed at most one instance
    pub fn is_unique(&self) -> bool {
        self.races == 0
    }
}

/// One step of a lifecycle walk-through
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct Step {
    pub step: usize,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[tabled(display("display::option", ""))]
    pub instance: Option<InstanceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[tabled(display("display::option", ""))]
    pub address: Option<Address>,
    pub outcome: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(trial: usize, identities: usize) -> TrialReport {
        TrialReport {
            trial,
            identities,
            constructed: identities,
            leaked: identities.saturating_sub(1),
            failures: 0,
            elapsed: Duration::from_millis(2),
            ids: Vec::new(),
        }
    }

    #[test]
    fn summary() {
        let report = Report::new(Kind::Unsync, 4, vec![trial(0, 1), trial(1, 3), trial(2, 2)]);
        assert_eq!(report.trials, 3);
        assert_eq!(report.races, 2);
        assert_eq!(report.max_identities, 3);
        assert_eq!(report.constructed, 6);
        assert_eq!(report.leaked, 3);
        assert_eq!(report.elapsed, Duration::from_millis(6));
        assert!(!report.is_unique());
    }

    #[test]
    fn serialize() -> anyhow::Result<()> {
        let report = Report::new(Kind::Locked, 2, vec![trial(0, 1)]);
        let value = serde_json::to_value(&report)?;
        assert_eq!(value["strategy"], "locked");
        assert_eq!(value["races"], 0);
        assert_eq!(value["elapsed"], "2ms");
        assert_eq!(value["details"][0]["identities"], 1);
        Ok(())
    }

    #[test]
    fn table() {
        let table = tabled::Table::new([StrategyInfo::from(Kind::Once)]).to_string();
        assert!(table.contains("thread-safe"));
        assert!(table.contains("once"));
    }
}
