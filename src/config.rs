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
** Created on: 2026-10-19T13:51:09
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{registry::AfterTeardown, utils::LoadFromFile};

/// Environment variable pointing to a configuration file
pub const CONFIG_ENV: &str = "LAB_CONFIG";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrent callers per trial
    pub threads: usize,
    /// Number of trials, each one on a fresh registry
    pub trials: usize,
    /// Time spent in the resource constructor
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Behaviour of the locked strategy after teardown
    pub policy: AfterTeardown,
    /// Simulated allocation failures for the first constructions of a trial
    pub fail_first: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 5,
            trials: 1,
            delay: Duration::ZERO,
            policy: AfterTeardown::default(),
            fail_first: 0,
        }
    }
}

impl Config {
    /// Settings used to expose the unsynchronized strategy race
    pub fn stress(self) -> Self {
        Self {
            threads: 64,
            trials: 100,
            delay: Duration::from_millis(1),
            ..self
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("singleton-lab").join("config.yml"))
    }

    /// Load configuration
    ///
    /// Lookup order: `path`, [CONFIG_ENV], [Config::default_path], defaults.
    #[tracing::instrument(level = "DEBUG")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::var_os(CONFIG_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| Self::default_path().filter(|p| p.is_file()));

        match path {
            Some(path) => {
                tracing::debug!(?path, "loading configuration");
                Self::load_from_file(path)?.validate()
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(self) -> Result<Self> {
        ensure!(self.threads > 0, "`threads` must be at least 1");
        ensure!(self.trials > 0, "`trials` must be at least 1");
        Ok(self)
    }
}
