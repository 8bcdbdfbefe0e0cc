// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use diagnostics::log_info;

use crate::common::Context;

pub async fn mkdir_command(ctx: &Context, path: &str) -> Result<()> {
    let root = ctx.open_root().await?;
    _ = root
        .open(path, ctx.options().open_existing(false).directory())
        .await?
        .into_dir()?;
    log_info!("Directory created: {path}", path: path);
    Ok(())
}
