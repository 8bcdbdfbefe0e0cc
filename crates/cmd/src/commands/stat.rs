// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use wfs::Entry;

use crate::common::Context;

pub async fn stat_command(ctx: &Context, path: &str, out: &mut impl Write) -> Result<()> {
    let root = ctx.open_root().await?;
    let entry = root.open(path, ctx.options()).await?;
    writeln!(out, "type:     {}", entry.entry_type())?;
    writeln!(out, "mime:     {}", entry.mime_type())?;
    match &entry {
        Entry::File(file) => {
            writeln!(out, "created:  {}", wfs::format_time(&file.created_time()))?;
            writeln!(out, "modified: {}", wfs::format_time(&file.modified_time()))?;
            writeln!(out, "size:     {}", file.size())?;
        }
        Entry::Directory(dir) => {
            writeln!(out, "created:  {}", wfs::format_time(&dir.created_time()))?;
            writeln!(out, "modified: {}", wfs::format_time(&dir.modified_time()))?;
            writeln!(out, "entries:  {}", dir.children().len())?;
            writeln!(out, "mount:    {}", serde_json::to_string(&dir.mount_info())?)?;
        }
    }
    Ok(())
}
