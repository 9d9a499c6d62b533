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
** Created on: 2026-10-19T09:48:55
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Counters, Error, Handle, Instance, InstanceId, Result};

type Inner<T> = Option<Arc<Instance<T>>>;

/// Storage for registries that support teardown
///
/// The slot is either empty or holds a fully built instance, a poisoned lock
/// is thus safe to recover from. Locks are never held while running caller
/// code: [Slot::with] works on its own reference to the instance.
pub(crate) struct Slot<T>(RwLock<Inner<T>>);

impl<T> Slot<T> {
    pub const fn empty() -> Self {
        Self(RwLock::new(None))
    }

    pub fn new(instance: Instance<T>) -> Self {
        Self(RwLock::new(Some(Arc::new(instance))))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Inner<T>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Inner<T>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle on the current instance, if any
    pub fn handle(&self) -> Option<Handle<'_, T>> {
        self.read()
            .as_deref()
            .map(|instance| Handle::slot(self, instance))
    }

    pub fn current_id(&self) -> Option<InstanceId> {
        self.read().as_deref().map(Instance::id)
    }

    /// Run `fun` on instance `id`
    ///
    /// The instance outlives `fun` even if it is torn down meanwhile, `fun`
    /// may thus use the registry (including its teardown).
    pub fn with<R, F>(&self, id: InstanceId, fun: F) -> Result<R>
    where
        F: FnOnce(&T) -> R,
    {
        let instance = match self.read().as_ref() {
            Some(instance) if instance.id() == id => Arc::clone(instance),
            Some(instance) => {
                return Err(Error::Replaced {
                    handle: id,
                    current: instance.id(),
                });
            }
            None => return Err(Error::TornDown),
        };
        Ok(fun(instance.value()))
    }

    /// Store `instance`, returning the one it replaced
    pub fn replace(&self, instance: Arc<Instance<T>>) -> Inner<T> {
        self.write().replace(instance)
    }

    /// Destroy the current instance, under exclusive access
    pub fn teardown(&self, counters: &Counters) -> bool {
        self.teardown_with(counters, || ())
    }

    /// Same as [Slot::teardown], `on_destroyed` runs before releasing the lock
    pub fn teardown_with<F>(&self, counters: &Counters, on_destroyed: F) -> bool
    where
        F: FnOnce(),
    {
        let mut guard = self.write();
        match guard.take() {
            Some(instance) => {
                tracing::debug!(id = %instance.id(), "tearing down");
                on_destroyed();
                drop(instance);
                counters.destroyed();
                true
            }
            None => {
                tracing::debug!("no instance, nothing to tear down");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Kind;

    #[test]
    fn stale_handles() -> Result<()> {
        let counters = Counters::new();
        let slot = Slot::new(Instance::build(Kind::Locked, || Ok(42_u32))?);

        let handle = slot.handle().expect("slot should be set");
        assert_eq!(handle.with(|v| *v)?, 42);

        let id = handle.id();
        let previous = slot.replace(Arc::new(Instance::build(Kind::Locked, || Ok(43_u32))?));
        assert_eq!(previous.map(|i| i.id()), Some(id));
        assert!(!handle.is_current());
        assert!(matches!(
            handle.with(|v| *v),
            Err(Error::Replaced { handle: stale, .. }) if stale == id
        ));

        assert!(slot.teardown(&counters));
        assert!(matches!(handle.with(|v| *v), Err(Error::TornDown)));
        assert!(slot.handle().is_none());

        assert!(!slot.teardown(&counters));
        assert_eq!(counters.snapshot().destroyed, 1);
        Ok(())
    }

    #[test]
    fn teardown_from_within() -> Result<()> {
        let counters = Counters::new();
        let slot = Slot::new(Instance::build(Kind::Locked, || Ok(String::from("held")))?);
        let handle = slot.handle().expect("slot should be set");

        let (value, destroyed) = handle.with(|v| (v.clone(), slot.teardown(&counters)))?;
        assert_eq!(value, "held");
        assert!(destroyed);
        assert!(slot.current_id().is_none());
        assert_eq!(counters.snapshot().destroyed, 1);
        Ok(())
    }
}
