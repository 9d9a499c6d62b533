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
** Created on: 2026-10-19T15:20:44
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Result, ensure};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::{io::Write, path::PathBuf};
use tabled::{Table, Tabled, settings::Style};

use crate::{
    config::Config,
    harness::{Harness, Report, StrategyInfo},
    registry::{AfterTeardown, Kind},
};

#[derive(Subcommand, Debug, Clone)]
pub enum Action {
    /// List available strategies
    List,
    /// Run concurrent callers against a strategy
    Run {
        #[arg(value_enum)]
        strategy: Kind,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Stress the unsynchronized strategy until it builds more than one instance
    Race {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Acquire concurrently, tear down twice and acquire again (aliases: demo)
    #[clap(alias = "demo")]
    Lifecycle {
        #[arg(value_enum)]
        strategy: Kind,
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command line overrides of the configuration file
#[derive(clap::Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Concurrent callers
    #[arg(long, short)]
    pub threads: Option<usize>,
    /// Number of trials
    #[arg(long)]
    pub trials: Option<usize>,
    /// Time spent in the resource constructor (ex: `1ms`)
    #[arg(long)]
    pub delay: Option<humantime::Duration>,
    /// Behaviour of the locked strategy after teardown
    #[arg(long, value_enum)]
    pub policy: Option<AfterTeardown>,
    /// Simulate allocation failures on the first constructions of a trial
    #[arg(long)]
    pub fail_first: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: Config) -> Config {
        Config {
            threads: self.threads.unwrap_or(config.threads),
            trials: self.trials.unwrap_or(config.trials),
            delay: self.delay.map_or(config.delay, Into::into),
            policy: self.policy.unwrap_or(config.policy),
            fail_first: self.fail_first.unwrap_or(config.fail_first),
        }
    }
}

#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    #[default]
    Table,
    Json,
    Yaml,
}

impl Format {
    pub fn print<W, T>(&self, out: &mut W, items: &[T]) -> Result<()>
    where
        W: Write,
        T: Serialize + Tabled,
    {
        match self {
            Format::Table => writeln!(out, "{}", Table::new(items).with(Style::rounded()))?,
            _ => self.print_value(out, items)?,
        }
        Ok(())
    }

    pub fn print_value<W, T>(&self, out: &mut W, value: &T) -> Result<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        match self {
            Format::Yaml => serde_yaml_ng::to_writer(&mut *out, value)?,
            _ => {
                serde_json::to_writer_pretty(&mut *out, value)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    pub fn print_report<W: Write>(&self, out: &mut W, report: &Report) -> Result<()> {
        match self {
            Format::Table => {
                self.print(out, &report.details)?;
                self.print(out, std::slice::from_ref(report))
            }
            _ => self.print_value(out, report),
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub action: Action,
    /// Configuration file (yaml or json)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, short, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

impl Args {
    #[tracing::instrument(skip(self, out), fields(action = ?self.action))]
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.action {
            Action::List => self
                .format
                .print(out, &Kind::ALL.map(StrategyInfo::from))?,
            Action::Run {
                strategy,
                overrides,
            } => {
                let report = Harness::new(overrides.apply(config))?.run(*strategy)?;
                self.format.print_report(out, &report)?;
                ensure!(
                    !strategy.is_thread_safe() || report.is_unique(),
                    "{strategy}: {} trial(s) observed more than one instance",
                    report.races
                );
            }
            Action::Race { overrides } => {
                let harness = Harness::new(overrides.apply(config.stress()))?;
                let report = harness.run(Kind::Unsync)?;
                self.format.print_report(out, &report)?;
                if report.is_unique() {
                    let config = harness.config();
                    tracing::warn!(
                        threads = config.threads,
                        trials = config.trials,
                        delay = ?config.delay,
                        "race not observed, try more threads or a longer delay"
                    );
                }
            }
            Action::Lifecycle {
                strategy,
                overrides,
            } => {
                let steps = Harness::new(overrides.apply(config))?.lifecycle(*strategy)?;
                self.format.print(out, &steps)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse() -> Result<()> {
        let args = Args::try_parse_from([
            "singleton-lab",
            "run",
            "locked",
            "--threads",
            "12",
            "--delay",
            "2ms",
            "--policy",
            "refuse",
            "-f",
            "json",
        ])?;
        assert_eq!(args.format, Format::Json);
        let Action::Run {
            strategy,
            overrides,
        } = args.action
        else {
            panic!("unexpected action: {:?}", args.action);
        };
        assert_eq!(strategy, Kind::Locked);

        let config = overrides.apply(Config::default());
        assert_eq!(config.threads, 12);
        assert_eq!(config.trials, 1);
        assert_eq!(config.delay, Duration::from_millis(2));
        assert_eq!(config.policy, AfterTeardown::Refuse);
        Ok(())
    }

    #[test]
    fn parse_errors() {
        assert!(Args::try_parse_from(["singleton-lab", "run", "double"]).is_err());
        assert!(Args::try_parse_from(["singleton-lab", "lifecycle"]).is_err());
        assert!(Args::try_parse_from(["singleton-lab", "demo", "eager"]).is_ok());
    }

    #[test]
    fn race_defaults() -> Result<()> {
        let args = Args::try_parse_from(["singleton-lab", "race", "--trials", "3"])?;
        let Action::Race { overrides } = args.action else {
            panic!("unexpected action: {:?}", args.action);
        };
        let config = overrides.apply(Config::default().stress());
        assert_eq!((config.threads, config.trials), (64, 3));
        Ok(())
    }

    #[test]
    fn list() -> Result<()> {
        let args = Args::try_parse_from([
            "singleton-lab",
            "list",
            "--format",
            "json",
            "--config",
            "data/config.yml",
        ])?;
        let mut out = Vec::new();
        args.run(&mut out)?;

        let value: serde_json::Value = serde_json::from_slice(&out)?;
        let names: Vec<_> = value
            .as_array()
            .expect("a list of strategies")
            .iter()
            .map(|s| s["name"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(names, ["unsync", "locked", "once", "eager"]);
        Ok(())
    }

    #[test]
    fn lifecycle_yaml() -> Result<()> {
        let args = Args::try_parse_from([
            "singleton-lab",
            "lifecycle",
            "once",
            "-t",
            "2",
            "-f",
            "yaml",
            "--config",
            "data/config.yml",
        ])?;
        let mut out = Vec::new();
        args.run(&mut out)?;
        let steps: serde_yaml_ng::Value = serde_yaml_ng::from_slice(&out)?;
        assert_eq!(steps.as_sequence().map(Vec::len), Some(6));
        Ok(())
    }
}
