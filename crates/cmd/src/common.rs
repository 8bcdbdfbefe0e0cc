// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use diagnostics::log_debug;
use drivefs::{DriveConfig, DriveDriver};
use localfs::{LocalDirectory, LocalDriver, ROOT_KEY};
use wfs::memory::MemoryDriver;
use wfs::{Dir, EntryInfo, ErrorKind, FileType, OpenOptions, Registry};

/// Settings shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Local store holding the root directory.
    pub db: PathBuf,
    /// Access token forwarded to remote mounts.
    pub token: Option<String>,
    /// YAML file with remote driver settings.
    pub drive_config: Option<PathBuf>,
}

impl Context {
    pub fn new(db: impl Into<PathBuf>) -> Self {
        Self {
            db: db.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_drive_config(mut self, path: Option<PathBuf>) -> Self {
        self.drive_config = path;
        self
    }

    /// Open options carrying the token, so reopened remote mounts authenticate.
    pub fn options(&self) -> OpenOptions {
        match &self.token {
            Some(token) => OpenOptions::new().param(token.as_str()),
            None => OpenOptions::new(),
        }
    }

    fn db_path(&self) -> Result<&str> {
        self.db
            .to_str()
            .ok_or_else(|| anyhow!("database path is not UTF-8: {}", self.db.display()))
    }

    /// Install the drivers and mount the local store as the root.
    pub async fn open_root(&self) -> Result<Dir> {
        self.install_drivers()?;
        let path = self.db_path()?;
        log_debug!("Opening root at {path}", path: path);
        LocalDirectory::mount(None, path, ROOT_KEY)
            .await
            .with_context(|| format!("cannot open local store {path}"))
    }

    fn install_drivers(&self) -> Result<()> {
        if wfs::registry::installed().is_some() {
            return Ok(());
        }
        let config = match &self.drive_config {
            Some(path) => drivefs::load_config(path)
                .with_context(|| format!("cannot load drive config {}", path.display()))?,
            None => DriveConfig::default(),
        };
        let installed = Registry::builder()
            .driver(LocalDriver)
            .driver(DriveDriver::new(config)?)
            .driver(MemoryDriver)
            .install();
        match installed {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == &ErrorKind::AlreadyInstalled => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Open the directory holding the last component of `path`.
    pub async fn open_parent<'a>(&self, root: &Dir, path: &'a str) -> Result<(Dir, &'a str)> {
        let trimmed = path.trim_end_matches('/');
        let (parent, name) = match trimmed.rsplit_once('/') {
            Some((parent, name)) => (if parent.is_empty() { "/" } else { parent }, name),
            None => ("", trimmed),
        };
        if name.is_empty() {
            return Err(anyhow!("path names no entry: {path:?}"));
        }
        let dir = root.open(parent, self.options()).await?.into_dir()?;
        Ok((dir, name))
    }
}

/// Helper function to format file sizes
pub fn format_file_size(size: u64) -> String {
    if size >= 1024 * 1024 {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    } else if size >= 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else {
        format!("{size}B")
    }
}

/// One `ls` line: type, size, modification time, name and mount target.
pub fn format_entry(name: &str, info: &EntryInfo) -> String {
    let kind = match info.entry_type {
        FileType::File => "file",
        FileType::Directory => "dir",
        FileType::Mount => "mount",
    };
    let size = info.size.map(format_file_size).unwrap_or_else(|| "-".to_string());
    let modified = info.modified_time.format("%Y-%m-%d %H:%M:%S");
    match &info.driver {
        Some(driver) => format!("{kind:<5} {size:>8} {modified} {name} -> {driver}"),
        None => format!("{kind:<5} {size:>8} {modified} {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(12), "12B");
        assert_eq!(format_file_size(2048), "2.0KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0MB");
    }

    #[test]
    fn test_format_entry() {
        let when = wfs::parse_time("2024-03-04T05:06:07.000Z").unwrap();
        let info = EntryInfo {
            entry_type: FileType::Mount,
            mime_type: "application/vnd.google-apps.folder".to_string(),
            created_time: when,
            modified_time: when,
            size: None,
            driver: Some("drive".to_string()),
        };
        assert_eq!(format_entry("remote", &info), "mount        - 2024-03-04 05:06:07 remote -> drive");
    }

    #[test]
    fn test_token_becomes_open_param() {
        let ctx = Context::new("x.duckdb").with_token(Some(String::new()));
        assert!(ctx.token.is_none());
        let ctx = ctx.with_token(Some("abc".to_string()));
        assert_eq!(ctx.token.as_deref(), Some("abc"));
    }
}
