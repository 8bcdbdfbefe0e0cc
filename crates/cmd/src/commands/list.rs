// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use wfs::Entry;

use crate::common::{Context, format_entry};

/// List a directory, or describe a single file.
pub async fn list_command(ctx: &Context, path: &str, out: &mut impl Write) -> Result<()> {
    let root = ctx.open_root().await?;
    match root.open(path, ctx.options()).await? {
        Entry::Directory(dir) => {
            for (name, info) in dir.children() {
                writeln!(out, "{}", format_entry(&name, &info))?;
            }
        }
        Entry::File(file) => {
            let name = path.rsplit('/').next().unwrap_or(path);
            let info = wfs::EntryInfo {
                entry_type: file.entry_type(),
                mime_type: file.mime_type(),
                created_time: file.created_time(),
                modified_time: file.modified_time(),
                size: Some(file.size()),
                driver: None,
            };
            writeln!(out, "{}", format_entry(name, &info))?;
        }
    }
    Ok(())
}
