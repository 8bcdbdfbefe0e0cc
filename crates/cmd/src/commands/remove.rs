// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

use crate::common::Context;

/// Remove an entry. Mount points are unlinked without touching their target.
pub async fn remove_command(ctx: &Context, path: &str) -> Result<()> {
    let root = ctx.open_root().await?;
    // Open the parent first so remote mounts on the way get the token.
    let (parent, name) = ctx.open_parent(&root, path).await?;
    parent.remove(name).await?;
    Ok(())
}
