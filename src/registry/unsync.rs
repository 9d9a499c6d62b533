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
** Created on: 2026-10-19T10:15:09
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::sync::{Arc, Mutex, PoisonError};

use super::{
    Counters, Factory, Handle, Instance, Kind, Result, Singleton, Slot, Stats, Teardown,
};

/// Lazy singleton without synchronization
///
/// **Not thread-safe**: the existence check and the store of a new instance
/// are two separate steps, concurrent first callers may all construct an
/// instance. The last store wins, overwritten instances are leaked (kept
/// until the registry is dropped) and accounted in [Stats::leaked].
pub struct UnsyncSingleton<T, F = Factory<T>> {
    factory: F,
    slot: Slot<T>,
    /// overwritten instances, grows by one per lost race and is only freed
    /// with the registry
    orphans: Mutex<Vec<Arc<Instance<T>>>>,
    counters: Counters,
}

impl<T, F> UnsyncSingleton<T, F>
where
    F: Fn() -> anyhow::Result<T>,
{
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            slot: Slot::empty(),
            orphans: Mutex::new(Vec::new()),
            counters: Counters::new(),
        }
    }
}

impl<T, F> Singleton for UnsyncSingleton<T, F>
where
    T: Send + Sync,
    F: Fn() -> anyhow::Result<T> + Send + Sync,
{
    type Target = T;

    fn kind(&self) -> Kind {
        Kind::Unsync
    }

    #[tracing::instrument(level = "TRACE", name = "unsync", skip(self))]
    fn get_instance(&self) -> Result<Handle<'_, T>> {
        if let Some(handle) = self.slot.handle() {
            return Ok(handle);
        }

        // other callers may be right here as well
        let instance = Arc::new(
            self.counters
                .track(Instance::build(Kind::Unsync, &self.factory))?,
        );
        let handle = Handle::slot(&self.slot, &instance);

        if let Some(previous) = self.slot.replace(instance) {
            tracing::warn!(
                overwritten = %previous.id(),
                current = %handle.id(),
                "instance overwritten, leaking it"
            );
            self.counters.leaked();
            self.orphans
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(previous);
        }
        Ok(handle)
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    fn teardown(&self) -> Option<&dyn Teardown> {
        Some(self)
    }
}

impl<T, F> Teardown for UnsyncSingleton<T, F> {
    #[tracing::instrument(level = "DEBUG", name = "unsync_teardown", skip(self))]
    fn delete_instance(&self) -> bool {
        self.slot.teardown(&self.counters)
    }
}
