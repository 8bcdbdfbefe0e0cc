// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use bytes::Bytes;
use diagnostics::log_info;

use crate::common::Context;

/// Create a new file holding `content`.
pub async fn put_command(ctx: &Context, path: &str, content: Bytes, mime_type: Option<&str>) -> Result<u64> {
    let root = ctx.open_root().await?;
    let mut options = ctx.options().open_existing(false).data(content);
    if let Some(mime_type) = mime_type {
        options = options.mime_type(mime_type);
    }
    let file = root.open(path, options).await?.into_file()?;
    log_info!("Created {path} ({size} bytes)", path: path, size: file.size());
    Ok(file.size())
}
