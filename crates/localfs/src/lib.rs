// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Local store driver.
//!
//! Files and directories live in a DuckDB database file. Mount params are
//! `[database_path: string, root_key: integer = 1]`.

mod directory;
mod error;
mod file;
mod store;

pub use directory::LocalDirectory;
pub use error::StoreError;
pub use file::LocalFile;
pub use store::{ROOT_KEY, Store};

use async_trait::async_trait;
use serde_json::Value;
use wfs::{Dir, Driver, Error, INODE_MIME};

pub const DRIVER_NAME: &str = "local";

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDriver;

#[async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn mime_type(&self) -> &'static str {
        INODE_MIME
    }

    async fn mount(&self, parent: Option<Dir>, params: &[Value]) -> wfs::Result<Dir> {
        let path = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_argument("local mount needs a database path"))?;
        let key = match params.get(1) {
            None | Some(Value::Null) => ROOT_KEY,
            Some(value) => value
                .as_i64()
                .ok_or_else(|| Error::invalid_argument("local root key must be an integer"))?,
        };
        LocalDirectory::mount(parent, path, key).await
    }
}
