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
** Created on: 2026-10-19T14:05:12
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

//! Concurrent callers against singleton registries

use anyhow::{Result, ensure};
use std::{
    collections::BTreeSet,
    sync::{Arc, Barrier, mpsc},
    time::Instant,
};

use crate::{
    config::Config,
    registry::{self, Address, InstanceId, Kind, Singleton},
    utils::{OnDrop, ThreadPool},
};

mod report;
pub use report::{Report, Step, StrategyInfo, TrialReport, kind_str};

mod resource;
pub use resource::Resource;

type Registry = Arc<dyn Singleton<Target = Resource>>;

/// What a caller got from [Singleton::get_instance]
#[derive(Debug)]
struct Observation {
    worker: usize,
    result: std::result::Result<(InstanceId, Address), String>,
}

pub struct Harness {
    config: Config,
    pool: ThreadPool,
}

impl Harness {
    pub fn new(config: Config) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            pool: ThreadPool::new(config.threads)?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn registry(&self, kind: Kind) -> registry::Result<Registry> {
        registry::for_kind(
            kind,
            Resource::factory(self.config.delay, self.config.fail_first),
            self.config.policy,
        )
    }

    /// Run `trials` trials of `threads` concurrent callers
    #[tracing::instrument(skip(self), fields(threads = self.config.threads, trials = self.config.trials))]
    pub fn run(&self, kind: Kind) -> Result<Report> {
        let details = (0..self.config.trials)
            .map(|trial| self.trial(kind, trial))
            .collect::<Result<Vec<_>>>()?;
        let report = Report::new(kind, self.config.threads, details);

        if report.races != 0 {
            if kind.is_thread_safe() {
                tracing::error!(races = report.races, "uniqueness violated");
            } else {
                tracing::info!(races = report.races, "race observed");
            }
        }
        Ok(report)
    }

    #[tracing::instrument(level = "DEBUG", skip(self, kind))]
    fn trial(&self, kind: Kind, trial: usize) -> Result<TrialReport> {
        let start = Instant::now();
        let registry = match self.registry(kind) {
            Ok(registry) => registry,
            Err(err) => {
                tracing::warn!(error = %err, "startup construction failed");
                let mut report = TrialReport::new(
                    trial,
                    Vec::new(),
                    &Default::default(),
                    self.config.threads,
                );
                report.elapsed = start.elapsed();
                return Ok(report);
            }
        };
        let _teardown = OnDrop::new(|| {
            if let Some(teardown) = registry.teardown() {
                teardown.delete_instance();
            }
        });

        let observations = self.observe(&registry)?;
        let ids: BTreeSet<InstanceId> = observations
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|(id, _)| *id))
            .collect();
        let failures = observations.iter().filter(|o| o.result.is_err()).count();

        let mut report = TrialReport::new(
            trial,
            ids.into_iter().collect(),
            &registry.stats(),
            failures,
        );
        report.elapsed = start.elapsed();
        tracing::debug!(identities = report.identities, failures, "trial done");
        Ok(report)
    }

    /// Release every worker at once on [Singleton::get_instance]
    fn observe(&self, registry: &Registry) -> Result<Vec<Observation>> {
        let threads = self.config.threads;
        let barrier = Arc::new(Barrier::new(threads));
        let (tx, rx) = mpsc::channel();

        for worker in 0..threads {
            let (barrier, registry, tx) = (Arc::clone(&barrier), Arc::clone(registry), tx.clone());
            let spawned = self.pool.spawn(move || {
                barrier.wait();
                let result = registry
                    .get_instance()
                    .map(|handle| (handle.id(), handle.address()))
                    .map_err(|err| format!("{:#}", anyhow::Error::from(err)));
                if tx.send(Observation { worker, result }).is_err() {
                    tracing::error!(worker, "observation dropped");
                }
            });
            ensure!(spawned, "thread pool stopped");
        }
        drop(tx);

        let mut observations: Vec<_> = rx.iter().collect();
        ensure!(
            observations.len() == threads,
            "{} worker(s) did not report",
            threads - observations.len()
        );
        observations.sort_by_key(|o| o.worker);
        Ok(observations)
    }

    /// Concurrent acquisition, double teardown and re-acquisition
    #[tracing::instrument(skip(self))]
    pub fn lifecycle(&self, kind: Kind) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        let mut push = |action: String, found: Option<(InstanceId, Address)>, outcome: String| {
            steps.push(Step {
                step: steps.len() + 1,
                action,
                instance: found.map(|(id, _)| id),
                address: found.map(|(_, address)| address),
                outcome,
            })
        };

        let registry = match self.registry(kind) {
            Ok(registry) => {
                let stats = registry.stats();
                push(
                    String::from("startup"),
                    None,
                    format!("{} instance(s) constructed", stats.constructed),
                );
                registry
            }
            Err(err) => {
                push(String::from("startup"), None, format!("{:#}", anyhow::Error::from(err)));
                return Ok(steps);
            }
        };

        for observation in self.observe(&registry)? {
            let action = format!("thread {}: get_instance", observation.worker);
            match observation.result {
                Ok(found) => push(action, Some(found), String::from("ok")),
                Err(err) => push(action, None, err),
            }
        }

        match registry.teardown() {
            Some(teardown) => {
                for _ in 0..2 {
                    let outcome = match teardown.delete_instance() {
                        true => "destroyed",
                        false => "nothing to destroy",
                    };
                    push(String::from("delete_instance"), None, String::from(outcome));
                }
            }
            None => push(
                String::from("delete_instance"),
                None,
                String::from("not supported"),
            ),
        }

        match registry.get_instance() {
            Ok(handle) => {
                let outcome = match handle.with(Resource::serial) {
                    Ok(serial) => format!("ok, built by attempt {serial}"),
                    Err(err) => format!("{:#}", anyhow::Error::from(err)),
                };
                push(
                    String::from("get_instance"),
                    Some((handle.id(), handle.address())),
                    outcome,
                )
            }
            Err(err) => push(
                String::from("get_instance"),
                None,
                format!("{:#}", anyhow::Error::from(err)),
            ),
        }

        let stats = registry.stats();
        push(
            String::from("stats"),
            None,
            format!(
                "constructed: {}, destroyed: {}, leaked: {}, failures: {}",
                stats.constructed, stats.destroyed, stats.leaked, stats.failures
            ),
        );
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AfterTeardown;
    use std::time::Duration;

    fn harness(threads: usize, trials: usize) -> Result<Harness> {
        Harness::new(Config {
            threads,
            trials,
            ..Default::default()
        })
    }

    #[test]
    fn thread_safe_strategies() -> Result<()> {
        let harness = harness(8, 5)?;
        for kind in [Kind::Locked, Kind::Once, Kind::Eager] {
            let report = harness.run(kind)?;
            assert!(report.is_unique(), "{kind}: {report:?}");
            assert_eq!(report.trials, 5);
            assert_eq!(report.constructed, 5);
            assert_eq!(report.failures, 0);
            assert!(report.details.iter().all(|t| t.identities == 1));
        }
        Ok(())
    }

    #[test]
    fn race() -> Result<()> {
        let harness = Harness::new(Config::default().stress())?;
        let report = harness.run(Kind::Unsync)?;
        assert_ne!(report.races, 0, "race not observed: {report:?}");
        assert!(report.leaked >= report.races);
        Ok(())
    }

    #[test]
    fn allocation_failures() -> Result<()> {
        let harness = Harness::new(Config {
            threads: 4,
            trials: 2,
            fail_first: 1,
            ..Default::default()
        })?;

        // the failing caller reports, the others get the retried instance
        let report = harness.run(Kind::Locked)?;
        assert_eq!(report.failures, 2);
        assert!(report.details.iter().all(|t| t.identities == 1));

        // eager fails at startup, every caller is affected
        let report = harness.run(Kind::Eager)?;
        assert_eq!(report.failures, 8);
        assert_eq!(report.constructed, 0);
        Ok(())
    }

    #[test]
    fn lifecycle() -> Result<()> {
        let harness = harness(5, 1)?;

        let steps = harness.lifecycle(Kind::Locked)?;
        // startup, 5 callers, 2 teardowns, re-acquire, stats
        assert_eq!(steps.len(), 10);
        let first = steps[1].instance;
        assert!(first.is_some());
        assert!(steps[1..6].iter().all(|s| s.instance == first));
        assert_eq!(steps[6].outcome, "destroyed");
        assert_eq!(steps[7].outcome, "nothing to destroy");
        assert!(steps[8].instance.is_some());
        assert_ne!(steps[8].instance, first);

        let steps = harness.lifecycle(Kind::Once)?;
        assert_eq!(steps.len(), 9);
        assert_eq!(steps[6].outcome, "not supported");
        assert_eq!(steps[7].instance, steps[1].instance);

        let steps = harness.lifecycle(Kind::Eager)?;
        assert_eq!(steps[0].outcome, "1 instance(s) constructed");
        assert_eq!(steps[8].instance, None);
        assert_eq!(steps[8].outcome, "instance has been torn down");
        Ok(())
    }

    #[test]
    fn lifecycle_refuse() -> Result<()> {
        let harness = Harness::new(Config {
            policy: AfterTeardown::Refuse,
            delay: Duration::from_millis(1),
            ..Default::default()
        })?;
        let steps = harness.lifecycle(Kind::Locked)?;
        assert_eq!(steps[8].instance, None);
        assert_eq!(steps[8].outcome, "instance has been torn down");
        Ok(())
    }
}
