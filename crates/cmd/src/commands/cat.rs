// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::log_debug;

use crate::common::Context;

/// Copy a file's content to `out`.
pub async fn cat_command(ctx: &Context, path: &str, out: &mut impl Write) -> Result<()> {
    let root = ctx.open_root().await?;
    let file = root.open(path, ctx.options()).await?.into_file()?;
    let blob = file.read_blob(0, None).await?;
    log_debug!("Read {size} bytes of {mime}", size: blob.data.len(), mime: blob.mime_type.as_str());
    out.write_all(&blob.data)?;
    out.flush()?;
    Ok(())
}
