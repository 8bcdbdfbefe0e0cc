// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! A virtual hierarchical file system.
//!
//! Files and directories from different storage backends are addressed
//! through one namespace. Backends implement [`Directory`] and [`File`] and
//! register a [`Driver`]; directories of one driver can be mounted inside
//! directories of another, and paths resolve across the boundary.

mod dir;
mod entry;
mod error;
mod file;
mod options;
mod path;
mod resolve;

pub mod memory;
pub mod registry;
pub mod units;

pub use dir::{CreateHook, Dir, Directory, RemoveHook};
pub use entry::{
    Children, Entry, EntryInfo, FileType, INODE_MIME, MountParams, MountRecord, TEXT_PLAIN,
    Timestamp, format_time, now, parse_time,
};
pub use error::{Error, ErrorKind, Result};
pub use file::{Blob, File, FileHandle};
pub use options::{ChildOptions, ErrorHandler, OpenOptions, PendingData};
pub use registry::{Driver, Registry};
pub use units::{Unit, Units};

#[cfg(test)]
mod tests;
