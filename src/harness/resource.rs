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
** Created on: 2026-10-19T14:10:37
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Result, bail};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// The shared resource the harness builds singletons of
#[derive(Debug)]
pub struct Resource {
    serial: usize,
}

impl Resource {
    #[tracing::instrument(level = "DEBUG", name = "resource")]
    pub fn new(serial: usize, delay: Duration) -> Self {
        tracing::info!("constructing resource");
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Self { serial }
    }

    /// Factory building resources, failing on the `fail_first` attempts
    pub fn factory(
        delay: Duration,
        fail_first: usize,
    ) -> impl Fn() -> Result<Resource> + Send + Sync + 'static {
        let attempts = AtomicUsize::new(0);
        move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < fail_first {
                bail!("simulated allocation failure ({}/{fail_first})", attempt + 1);
            }
            Ok(Resource::new(attempt, delay))
        }
    }

    /// Construction attempt that built this resource
    pub fn serial(&self) -> usize {
        self.serial
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        tracing::info!(serial = self.serial, "destroying resource");
    }
}
