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
** Created on: 2026-10-19T09:12:04
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

//! Singleton registries
//!
//! Four interchangeable ways of producing one shared instance of a resource,
//! all behind the [Singleton] trait:
//!
//! - [UnsyncSingleton]: lazy, unsynchronized, racy on purpose
//! - [LockedSingleton]: lazy, double-checked locking
//! - [OnceSingleton]: lazy, one-time initialization primitive
//! - [EagerSingleton]: built by an explicit startup call
//!
//! The registry always owns the instance, callers only get a borrowed
//! [Handle] that can't outlive it nor destroy it.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

mod error;
pub use error::{Error, Result};

mod instance;
pub use instance::{Address, Handle, Instance, InstanceId};

mod slot;
use slot::Slot;

mod stats;
use stats::Counters;
pub use stats::Stats;

mod unsync;
pub use unsync::UnsyncSingleton;

mod locked;
pub use locked::{AfterTeardown, LockedSingleton};

mod once;
pub use once::OnceSingleton;

mod eager;
pub use eager::EagerSingleton;

/// Factory type used by default, can be stored in a `static`
pub type Factory<T> = fn() -> anyhow::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Lazy construction without synchronization (racy)
    Unsync,
    /// Lazy construction using double-checked locking
    Locked,
    /// Lazy construction using a one-time initialization primitive
    Once,
    /// Construction at startup, before any concurrent access
    Eager,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Unsync, Kind::Locked, Kind::Once, Kind::Eager];

    pub fn is_thread_safe(&self) -> bool {
        !matches!(self, Kind::Unsync)
    }

    pub fn has_teardown(&self) -> bool {
        !matches!(self, Kind::Once)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Kind::Unsync => "check then construct, concurrent callers may each build one",
            Kind::Locked => "shared check, then exclusive re-check and construct",
            Kind::Once => "construction delegated to a once cell, no teardown",
            Kind::Eager => "constructed by an explicit startup call",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Unsync => "unsync",
            Kind::Locked => "locked",
            Kind::Once => "once",
            Kind::Eager => "eager",
        })
    }
}

/// Uniform contract of every singleton registry
pub trait Singleton: Send + Sync {
    type Target;

    fn kind(&self) -> Kind;

    /// Retrieve the shared instance, constructing it when the strategy allows
    fn get_instance(&self) -> Result<Handle<'_, Self::Target>>;

    /// Construction and destruction counters
    fn stats(&self) -> Stats;

    /// Access to explicit teardown, `None` when the strategy has none
    fn teardown(&self) -> Option<&dyn Teardown> {
        None
    }
}

pub trait Teardown {
    /// Destroy the current instance
    ///
    /// Returns `false` when there was nothing to destroy, calling it twice is
    /// harmless.
    fn delete_instance(&self) -> bool;
}

/// Build a registry of the given kind
///
/// [Kind::Eager] constructs the instance right away and may thus fail.
pub fn for_kind<T, F>(
    kind: Kind,
    factory: F,
    policy: AfterTeardown,
) -> Result<Arc<dyn Singleton<Target = T>>>
where
    T: Send + Sync + 'static,
    F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
{
    Ok(match kind {
        Kind::Unsync => Arc::new(UnsyncSingleton::new(factory)),
        Kind::Locked => Arc::new(LockedSingleton::new(factory).with_policy(policy)),
        Kind::Once => Arc::new(OnceSingleton::new(factory)),
        Kind::Eager => Arc::new(EagerSingleton::new(factory)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn teardown_availability() -> anyhow::Result<()> {
        for kind in Kind::ALL {
            let registry = for_kind(kind, move || Ok(kind.to_string()), AfterTeardown::default())?;
            assert_eq!(registry.kind(), kind);
            assert_eq!(registry.teardown().is_some(), kind.has_teardown());

            let handle = registry.get_instance()?;
            assert_eq!(handle.with(|value| value.clone())?, kind.to_string());
        }
        Ok(())
    }

    #[test]
    fn eager_fails_early() {
        let ret = for_kind::<String, _>(
            Kind::Eager,
            || Err(anyhow!("no memory")),
            AfterTeardown::default(),
        );
        assert!(matches!(ret, Err(Error::Construction { kind: Kind::Eager, .. })));

        // lazy kinds only fail on first access
        let registry = for_kind::<String, _>(
            Kind::Locked,
            || Err(anyhow!("no memory")),
            AfterTeardown::default(),
        )
        .expect("lazy registry should build");
        assert_eq!(registry.stats(), Stats::default());
        assert!(registry.get_instance().is_err());
        assert_eq!(registry.stats().failures, 1);
    }

    #[test]
    fn kind_serde() {
        assert_eq!("locked\n", serde_yaml_ng::to_string(&Kind::Locked).unwrap());
        assert_eq!(serde_yaml_ng::from_str::<Kind>("eager").unwrap(), Kind::Eager);
        assert_eq!(Kind::Once.to_string(), "once");
    }
}
