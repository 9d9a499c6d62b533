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
** Created on: 2026-10-19T09:20:41
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use super::{InstanceId, Kind};

/// Errors reported by singleton registries
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The factory failed to build the instance (ex: allocation failure)
    #[error("failed to construct {kind} instance")]
    Construction {
        kind: Kind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// Instance requested or used after teardown
    #[error("instance has been torn down")]
    TornDown,
    /// Handle refers to an instance that is no longer the registry's one
    #[error("instance {handle} has been replaced by {current}")]
    Replaced {
        handle: InstanceId,
        current: InstanceId,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn construction(kind: Kind, err: anyhow::Error) -> Self {
        Error::Construction {
            kind,
            source: err.into(),
        }
    }
}
