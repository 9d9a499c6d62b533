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
** Created on: 2026-10-19T11:06:23
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use once_cell::sync::OnceCell;

use super::{Counters, Factory, Handle, Instance, Kind, Result, Singleton, Stats};

/// Lazy singleton built through a one-time initialization primitive
///
/// Concurrent first callers block until the factory returns, the factory runs
/// once unless it fails (the next caller then tries again). There is no
/// teardown, the instance is dropped with the registry.
pub struct OnceSingleton<T, F = Factory<T>> {
    factory: F,
    cell: OnceCell<Instance<T>>,
    counters: Counters,
}

impl<T, F> OnceSingleton<T, F>
where
    F: Fn() -> anyhow::Result<T>,
{
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            cell: OnceCell::new(),
            counters: Counters::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T, F> Singleton for OnceSingleton<T, F>
where
    T: Send + Sync,
    F: Fn() -> anyhow::Result<T> + Send + Sync,
{
    type Target = T;

    fn kind(&self) -> Kind {
        Kind::Once
    }

    #[tracing::instrument(level = "TRACE", name = "once", skip(self))]
    fn get_instance(&self) -> Result<Handle<'_, T>> {
        let instance = self.cell.get_or_try_init(|| {
            self.counters
                .track(Instance::build(Kind::Once, &self.factory))
        })?;
        Ok(Handle::pinned(instance))
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }
}

/// Declare a process-wide [OnceSingleton]
///
/// ```ignore
/// static_singleton!(pub CONFIG: Config = Config::default());
///
/// let handle = CONFIG.get_instance()?;
/// ```
#[macro_export]
macro_rules! static_singleton {
    ($(#[$meta:meta])* $vis:vis $name:ident: $ty:ty = $init:expr) => {
        $(#[$meta])*
        $vis static $name: $crate::registry::OnceSingleton<$ty> =
            $crate::registry::OnceSingleton::new(
                (|| -> ::anyhow::Result<$ty> { Ok($init) }) as $crate::registry::Factory<$ty>,
            );
    };
}
