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
** Created on: 2026-10-19T10:41:52
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

use super::{
    Counters, Error, Factory, Handle, Instance, Kind, Result, Singleton, Slot, Stats, Teardown,
};

/// What [Singleton::get_instance] does once the instance was torn down
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AfterTeardown {
    /// construct a new instance
    #[default]
    Reconstruct,
    /// report [Error::TornDown] until the registry is re-armed
    Refuse,
}

/// Lazy singleton using double-checked locking
///
/// The fast path only takes shared access on the slot, construction happens
/// under exclusive access after checking again for a concurrent caller that
/// would have been faster.
pub struct LockedSingleton<T, F = Factory<T>> {
    factory: F,
    slot: Slot<T>,
    policy: AfterTeardown,
    torn_down: AtomicBool,
    counters: Counters,
}

impl<T, F> LockedSingleton<T, F>
where
    F: Fn() -> anyhow::Result<T>,
{
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            slot: Slot::empty(),
            policy: AfterTeardown::Reconstruct,
            torn_down: AtomicBool::new(false),
            counters: Counters::new(),
        }
    }

    pub fn with_policy(mut self, policy: AfterTeardown) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AfterTeardown {
        self.policy
    }

    /// Allow construction again after a teardown with [AfterTeardown::Refuse]
    pub fn rearm(&self) {
        self.torn_down.store(false, Ordering::Release);
    }
}

impl<T, F> Singleton for LockedSingleton<T, F>
where
    T: Send + Sync,
    F: Fn() -> anyhow::Result<T> + Send + Sync,
{
    type Target = T;

    fn kind(&self) -> Kind {
        Kind::Locked
    }

    #[tracing::instrument(level = "TRACE", name = "locked", skip(self))]
    fn get_instance(&self) -> Result<Handle<'_, T>> {
        if let Some(handle) = self.slot.handle() {
            return Ok(handle);
        }

        let mut guard = self.slot.write();
        if let Some(instance) = guard.as_deref() {
            tracing::debug!(id = %instance.id(), "constructed by a concurrent caller");
            return Ok(Handle::slot(&self.slot, instance));
        }
        if self.policy == AfterTeardown::Refuse && self.torn_down.load(Ordering::Acquire) {
            tracing::debug!("torn down, refusing to construct");
            return Err(Error::TornDown);
        }

        let instance: &Instance<T> = guard.insert(Arc::new(
            self.counters
                .track(Instance::build(Kind::Locked, &self.factory))?,
        ));
        Ok(Handle::slot(&self.slot, instance))
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    fn teardown(&self) -> Option<&dyn Teardown> {
        Some(self)
    }
}

impl<T, F> Teardown for LockedSingleton<T, F> {
    #[tracing::instrument(level = "DEBUG", name = "locked_teardown", skip(self))]
    fn delete_instance(&self) -> bool {
        self.slot.teardown_with(&self.counters, || {
            self.torn_down.store(true, Ordering::Release)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::{
        collections::HashSet,
        sync::{Barrier, atomic::AtomicUsize, mpsc},
        thread,
        time::Duration,
    };

    fn counting(count: Arc<AtomicUsize>) -> impl Fn() -> anyhow::Result<usize> {
        move || {
            thread::sleep(Duration::from_millis(1));
            Ok(count.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn unique() {
        const THREADS: usize = 32;

        for _ in 0..20 {
            let count = Arc::new(AtomicUsize::new(0));
            let registry = LockedSingleton::new(counting(Arc::clone(&count)));
            let barrier = Barrier::new(THREADS);

            let ids: HashSet<_> = thread::scope(|s| {
                let workers: Vec<_> = (0..THREADS)
                    .map(|_| {
                        s.spawn(|| {
                            barrier.wait();
                            registry.get_instance().map(|h| h.id()).ok()
                        })
                    })
                    .collect();
                workers
                    .into_iter()
                    .map(|w| w.join().unwrap())
                    .collect()
            });

            assert_eq!(ids.len(), 1);
            assert!(!ids.contains(&None));
            assert_eq!(count.load(Ordering::SeqCst), 1);
            assert_eq!(registry.stats().constructed, 1);
        }
    }

    #[test]
    fn construct_once() -> Result<()> {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = LockedSingleton::new(counting(Arc::clone(&count)));
        let first = registry.get_instance()?.id();
        for _ in 0..100 {
            assert_eq!(registry.get_instance()?.id(), first);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn reacquire() -> Result<()> {
        let registry: LockedSingleton<String, _> =
            LockedSingleton::new(|| Ok(String::from("instance")));
        let before = registry.get_instance()?;

        assert!(registry.delete_instance());
        assert!(!registry.delete_instance());
        assert!(matches!(before.with(|_| ()), Err(Error::TornDown)));

        let after = registry.get_instance()?;
        assert_ne!(before.id(), after.id());
        assert!(after.is_current());
        assert!(matches!(
            before.with(|_| ()),
            Err(Error::Replaced { handle, current }) if handle == before.id() && current == after.id()
        ));

        let stats = registry.stats();
        assert_eq!((stats.constructed, stats.destroyed, stats.live()), (2, 1, 1));
        Ok(())
    }

    #[test]
    fn refuse() -> Result<()> {
        let registry: LockedSingleton<u32, _> =
            LockedSingleton::new(|| Ok(7)).with_policy(AfterTeardown::Refuse);
        assert_eq!(registry.policy(), AfterTeardown::Refuse);
        registry.get_instance()?;

        assert!(registry.delete_instance());
        assert!(matches!(registry.get_instance(), Err(Error::TornDown)));
        assert!(matches!(registry.get_instance(), Err(Error::TornDown)));

        registry.rearm();
        assert_eq!(registry.get_instance()?.with(|v| *v)?, 7);
        assert_eq!(registry.stats().constructed, 2);
        Ok(())
    }

    #[test]
    fn refuse_without_instance() -> Result<()> {
        let registry: LockedSingleton<u32, _> =
            LockedSingleton::new(|| Ok(7)).with_policy(AfterTeardown::Refuse);

        // nothing destroyed, nothing to refuse
        assert!(!registry.delete_instance());
        assert_eq!(registry.get_instance()?.with(|v| *v)?, 7);

        assert!(registry.delete_instance());
        assert!(!registry.delete_instance());
        assert!(matches!(registry.get_instance(), Err(Error::TornDown)));
        Ok(())
    }

    #[test]
    fn teardown_within_access() -> Result<()> {
        let registry: Arc<LockedSingleton<u32, _>> = Arc::new(LockedSingleton::new(|| Ok(3)));
        let (tx, rx) = mpsc::channel();

        let worker = Arc::clone(&registry);
        thread::spawn(move || {
            let ret = worker
                .get_instance()
                .and_then(|handle| handle.with(|v| (*v, worker.delete_instance())));
            let _ = tx.send(ret);
        });

        let (value, destroyed) = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("teardown from within an access should not block")?;
        assert_eq!((value, destroyed), (3, true));
        assert_eq!(registry.stats().destroyed, 1);
        assert_eq!(registry.get_instance()?.with(|v| *v)?, 3);
        assert_eq!(registry.stats().constructed, 2);
        Ok(())
    }

    #[test]
    fn teardown_race() -> Result<()> {
        const THREADS: usize = 16;
        let registry: LockedSingleton<u32, _> = LockedSingleton::new(|| Ok(1));
        registry.get_instance()?;
        let barrier = Barrier::new(THREADS);

        let destroyed = thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        registry.delete_instance()
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| w.join().unwrap())
                .filter(|destroyed| *destroyed)
                .count()
        });
        assert_eq!(destroyed, 1);
        assert_eq!(registry.stats().destroyed, 1);
        Ok(())
    }

    #[test]
    fn failure_then_success() -> Result<()> {
        let attempts = AtomicUsize::new(0);
        let registry = LockedSingleton::new(|| match attempts.fetch_add(1, Ordering::SeqCst) {
            0 => Err(anyhow!("out of memory")),
            n => Ok(n),
        });

        assert!(matches!(
            registry.get_instance(),
            Err(Error::Construction {
                kind: Kind::Locked,
                ..
            })
        ));
        assert_eq!(registry.get_instance()?.with(|v| *v)?, 1);

        let stats = registry.stats();
        assert_eq!((stats.constructed, stats.failures), (1, 1));
        Ok(())
    }
}
