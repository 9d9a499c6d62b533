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
** Created on: 2026-10-19T15:52:08
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::Result;
use clap::Parser;
use cmdline::Args;
use utils::tracing_utils::tracing_init;

pub mod cmdline;
pub mod config;
pub mod harness;
pub mod registry;
pub mod utils;

fn main() -> Result<()> {
    tracing_init(std::io::stderr, Some("warn"))?;

    let args = Args::parse();
    args.run(&mut std::io::stdout().lock())
}
