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
** Created on: 2026-10-19T11:34:48
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use super::{Counters, Error, Handle, Instance, Kind, Result, Singleton, Slot, Stats, Teardown};

/// Singleton constructed by an explicit startup call
///
/// [EagerSingleton::new] builds the instance, it is meant to be called before
/// any concurrent access. [Singleton::get_instance] is then a plain read,
/// returning [Error::TornDown] once the instance was deleted.
pub struct EagerSingleton<T> {
    slot: Slot<T>,
    counters: Counters,
}

impl<T> EagerSingleton<T> {
    #[tracing::instrument(level = "DEBUG", name = "eager", skip(factory))]
    pub fn new<F>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        let counters = Counters::new();
        let instance = counters.track(Instance::build(Kind::Eager, factory))?;
        Ok(Self {
            slot: Slot::new(instance),
            counters,
        })
    }
}

impl<T> Singleton for EagerSingleton<T>
where
    T: Send + Sync,
{
    type Target = T;

    fn kind(&self) -> Kind {
        Kind::Eager
    }

    fn get_instance(&self) -> Result<Handle<'_, T>> {
        self.slot.handle().ok_or(Error::TornDown)
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    fn teardown(&self) -> Option<&dyn Teardown> {
        Some(self)
    }
}

impl<T> Teardown for EagerSingleton<T> {
    #[tracing::instrument(level = "DEBUG", name = "eager_teardown", skip(self))]
    fn delete_instance(&self) -> bool {
        self.slot.teardown(&self.counters)
    }
}
