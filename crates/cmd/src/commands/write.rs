// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use bytes::Bytes;

use crate::common::Context;

/// Overwrite an existing file from byte `offset`.
///
/// Without `count` everything after `offset` is replaced; with it only
/// `count` bytes are, and the rest of the file is kept.
pub async fn write_command(
    ctx: &Context,
    path: &str,
    content: Bytes,
    offset: u64,
    count: Option<u64>,
) -> Result<u64> {
    let root = ctx.open_root().await?;
    let file = root.open(path, ctx.options()).await?.into_file()?;
    Ok(file.write(&content, offset, count).await?)
}
