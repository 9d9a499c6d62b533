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
** Created on: 2026-10-19T13:40:26
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::{ffi::OsStr, fs::File, io::BufReader, path::Path};

/// Load a deserializable value from a yaml or json file
///
/// The format is selected on the file extension, defaulting to yaml (which
/// also accepts json).
pub trait LoadFromFile: Sized {
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>;
}

impl<T> LoadFromFile for T
where
    T: DeserializeOwned,
{
    #[tracing::instrument(level = "DEBUG", skip_all, fields(path = ?path.as_ref()))]
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        );
        match path.extension().and_then(OsStr::to_str) {
            Some("json") => serde_json::from_reader(reader)
                .with_context(|| format!("invalid json file {}", path.display())),
            _ => serde_yaml_ng::from_reader(reader)
                .with_context(|| format!("invalid yaml file {}", path.display())),
        }
    }
}
