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
** Created on: 2026-10-19T09:31:17
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize, Serializer};

use super::{Error, Kind, Result, Slot};

static S_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide instance identity, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(S_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Memory address of an instance's value
///
/// Only meaningful while the instance is alive, an address may be reused
/// once an instance is destroyed (use [InstanceId] to compare over time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(usize);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// The singleton instance, owned by its registry
pub struct Instance<T> {
    id: InstanceId,
    kind: Kind,
    value: T,
}

impl<T> Instance<T> {
    pub(crate) fn build<F>(kind: Kind, factory: F) -> Result<Self>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        match factory() {
            Ok(value) => {
                let id = InstanceId::next();
                tracing::info!(%id, %kind, "instance constructed");
                Ok(Self { id, kind, value })
            }
            Err(err) => {
                tracing::error!(%kind, ?err, "instance construction failed");
                Err(Error::construction(kind, err))
            }
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn address(&self) -> Address {
        Address(&self.value as *const T as *const () as usize)
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Instance<T> {
    fn drop(&mut self) {
        tracing::info!(id = %self.id, kind = %self.kind, "instance destroyed");
    }
}

impl<T> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("address", &self.address())
            .finish()
    }
}

enum Target<'a, T> {
    /// instance lives as long as the registry
    Pinned(&'a Instance<T>),
    /// instance may be torn down, resolved on each access
    Slot(&'a Slot<T>),
}

impl<T> Clone for Target<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Target<'_, T> {}

/// Borrowed, non-owning view on a registry's instance
///
/// A handle never keeps an instance alive: once the registry tears it down,
/// [Handle::with] reports [Error::TornDown] (or [Error::Replaced] when a new
/// instance took its place).
pub struct Handle<'a, T> {
    id: InstanceId,
    address: Address,
    target: Target<'a, T>,
}

impl<T> Clone for Handle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<'_, T> {}

impl<'a, T> Handle<'a, T> {
    pub(crate) fn pinned(instance: &'a Instance<T>) -> Self {
        Self {
            id: instance.id(),
            address: instance.address(),
            target: Target::Pinned(instance),
        }
    }

    pub(crate) fn slot(slot: &'a Slot<T>, instance: &Instance<T>) -> Self {
        Self {
            id: instance.id(),
            address: instance.address(),
            target: Target::Slot(slot),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether the handle still refers to the registry's current instance
    pub fn is_current(&self) -> bool {
        match self.target {
            Target::Pinned(_) => true,
            Target::Slot(slot) => slot.current_id() == Some(self.id),
        }
    }

    /// Run `fun` against the instance
    ///
    /// For registries with teardown, the instance stays alive until `fun`
    /// returns, even when torn down meanwhile.
    pub fn with<R, F>(&self, fun: F) -> Result<R>
    where
        F: FnOnce(&T) -> R,
    {
        match self.target {
            Target::Pinned(instance) => Ok(fun(instance.value())),
            Target::Slot(slot) => slot.with(self.id, fun),
        }
    }
}

impl<T> fmt::Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn ids() -> Result<()> {
        let first = Instance::build(Kind::Once, || Ok(1_u8))?;
        let second = Instance::build(Kind::Once, || Ok(1_u8))?;
        assert!(first.id() < second.id());
        assert_ne!(first.address(), second.address());
        assert_eq!(format!("{}", InstanceId(12)), "#12");
        Ok(())
    }

    #[test]
    fn build_failure() {
        let ret = Instance::<u8>::build(Kind::Unsync, || Err(anyhow!("no memory")));
        assert!(matches!(
            ret,
            Err(Error::Construction {
                kind: Kind::Unsync,
                ..
            })
        ));
    }

    #[test]
    fn pinned() -> Result<()> {
        let instance = Instance::build(Kind::Once, || Ok(String::from("value")))?;
        let handle = Handle::pinned(&instance);
        assert!(handle.is_current());
        assert_eq!(handle.id(), instance.id());
        assert_eq!(handle.address(), instance.address());
        assert_eq!(handle.with(String::len)?, 5);
        Ok(())
    }

    #[test]
    fn address_format() {
        assert_eq!(Address(0xbeef).to_string(), "0xbeef");
        assert_eq!(serde_json::to_string(&Address(16)).unwrap(), "\"0x10\"");
    }
}
