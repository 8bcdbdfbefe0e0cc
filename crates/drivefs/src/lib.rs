// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Remote document storage driver.
//!
//! Folders of a Drive-style REST service appear as directories. Mount
//! params are `[folder_id: string, access_token: string]`. The token is
//! never stored in a mount point, so reopening one needs the token passed
//! again as an extra open param.

mod client;
mod config;
mod directory;
mod error;
mod file;
mod models;
mod upload;

pub use client::{DriveClient, Download};
pub use config::{BearerToken, DEFAULT_API_URL, DEFAULT_UPLOAD_URL, DriveConfig, load_config};
pub use directory::{DRIVER_PROPERTY, DriveDirectory};
pub use error::{DriveError, Result};
pub use file::DriveFile;
pub use models::{FILE_FIELDS, FOLDER_MIME, FileList, FileResource};
pub use upload::UploadTarget;

use async_trait::async_trait;
use serde_json::Value;
use wfs::{Dir, Driver, Error};

pub const DRIVER_NAME: &str = "drive";

#[derive(Clone)]
pub struct DriveDriver {
    client: DriveClient,
}

impl DriveDriver {
    pub fn new(config: DriveConfig) -> Result<Self> {
        Ok(Self {
            client: DriveClient::new(config)?,
        })
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait]
impl Driver for DriveDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn mime_type(&self) -> &'static str {
        FOLDER_MIME
    }

    async fn mount(&self, parent: Option<Dir>, params: &[Value]) -> wfs::Result<Dir> {
        let folder_id = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_argument("drive mount needs a folder id"))?;
        let token = params
            .get(1)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(Error::invalid_credentials)?;
        DriveDirectory::mount(parent, self.client.clone(), folder_id, BearerToken::new(token)).await
    }
}
