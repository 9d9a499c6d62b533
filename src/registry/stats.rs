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
** Created on: 2026-10-19T10:02:30
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::Result;

/// Registry counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// successful constructions
    pub constructed: usize,
    /// instances destroyed through teardown
    pub destroyed: usize,
    /// instances overwritten by a racing caller, never destroyed
    pub leaked: usize,
    /// failed constructions
    pub failures: usize,
}

impl Stats {
    /// Instances currently alive, more than one means uniqueness was violated
    pub fn live(&self) -> usize {
        self.constructed.saturating_sub(self.destroyed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    constructed: AtomicUsize,
    destroyed: AtomicUsize,
    leaked: AtomicUsize,
    failures: AtomicUsize,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            constructed: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            leaked: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Account for a construction attempt
    pub fn track<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.constructed.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failures.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    pub fn destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn leaked(&self) {
        self.leaked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            constructed: self.constructed.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            leaked: self.leaked.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
