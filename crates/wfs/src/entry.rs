// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::error::{Error, Result};
use crate::file::FileHandle;

/// Default mime type of newly created files.
pub const TEXT_PLAIN: &str = "text/plain";

/// Mime type of local store directories and of remote mount point markers.
pub const INODE_MIME: &str = "application/vnd.wfs.inode";

pub type Timestamp = DateTime<Utc>;

/// Ordered parameters that re-mount a directory independently.
pub type MountParams = Vec<serde_json::Value>;

/// Name to summary map of a directory's children.
pub type Children = BTreeMap<String, EntryInfo>;

/// Current time at the millisecond precision stored by every driver.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339, UTC, milliseconds: `2024-05-01T12:00:00.000Z`.
pub fn format_time(time: &Timestamp) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_time(text: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::driver(format!("invalid timestamp '{text}': {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
    Mount,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Directory => "directory",
            FileType::Mount => "mount",
        }
    }

    /// Directories and mount points can both be traversed.
    pub fn is_dir(&self) -> bool {
        !matches!(self, FileType::File)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(FileType::File),
            "directory" => Ok(FileType::Directory),
            "mount" => Ok(FileType::Mount),
            other => Err(Error::invalid_argument(format!("unknown file type '{other}'"))),
        }
    }
}

/// Summary of one child as reported by its directory.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    pub entry_type: FileType,
    pub mime_type: String,
    pub created_time: Timestamp,
    pub modified_time: Timestamp,
    /// Content size in bytes, files only.
    pub size: Option<u64>,
    /// Driver name, mount points only.
    pub driver: Option<String>,
}

/// Persisted content of a mount point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountRecord {
    #[serde(rename = "driverName")]
    pub driver: String,
    #[serde(rename = "mountParams")]
    pub params: MountParams,
}

impl MountRecord {
    pub fn new(driver: impl Into<String>, params: MountParams) -> Self {
        Self {
            driver: driver.into(),
            params,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::driver(format!("encode mount record: {e}")))
    }

    /// Parse a stored record. Both fields are required and nothing else is accepted.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::driver(format!("malformed mount point: {e}")))
    }

    /// Stored params followed by caller supplied ones.
    pub fn params_with(&self, extra: &[serde_json::Value]) -> MountParams {
        self.params.iter().chain(extra).cloned().collect()
    }
}

/// Result of resolving a path.
#[derive(Clone, Debug)]
pub enum Entry {
    File(FileHandle),
    Directory(Dir),
}

impl Entry {
    pub fn entry_type(&self) -> FileType {
        match self {
            Entry::File(_) => FileType::File,
            Entry::Directory(dir) => dir.entry_type(),
        }
    }

    pub fn mime_type(&self) -> String {
        match self {
            Entry::File(file) => file.mime_type(),
            Entry::Directory(dir) => dir.mime_type(),
        }
    }

    pub fn as_dir(&self) -> Option<&Dir> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    pub fn into_dir(self) -> Result<Dir> {
        match self {
            Entry::Directory(dir) => Ok(dir),
            Entry::File(_) => Err(Error::not_a_directory()),
        }
    }

    pub fn into_file(self) -> Result<FileHandle> {
        match self {
            Entry::File(file) => Ok(file),
            Entry::Directory(_) => Err(Error::not_a_file()),
        }
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            Entry::File(file) => file.is_read_only(),
            Entry::Directory(dir) => dir.is_read_only(),
        }
    }

    pub(crate) fn into_read_only(self) -> Self {
        match self {
            Entry::File(file) => Entry::File(file.into_read_only()),
            Entry::Directory(dir) => Entry::Directory(dir.to_read_only()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_format_round_trip() {
        let t = now();
        let text = format_time(&t);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_time(&text).unwrap(), t);
    }

    #[test]
    fn test_mount_record_wire_names() {
        let record = MountRecord::new("drive", vec![serde_json::json!("abc")]);
        let json = String::from_utf8(record.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"driverName":"drive","mountParams":["abc"]}"#);
    }

    #[test]
    fn test_mount_record_rejects_extra_fields() {
        let bad = br#"{"driverName":"drive","mountParams":[],"extra":1}"#;
        assert!(MountRecord::from_json(bad).is_err());
        let missing = br#"{"driverName":"drive"}"#;
        assert!(MountRecord::from_json(missing).is_err());
    }

    #[test]
    fn test_file_type_parse() {
        assert_eq!("mount".parse::<FileType>().unwrap(), FileType::Mount);
        assert!("socket".parse::<FileType>().is_err());
        assert!(FileType::Mount.is_dir());
        assert!(!FileType::File.is_dir());
    }
}
