// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use diagnostics::log_debug;
use wfs::{File, Timestamp};

use crate::client::DriveClient;
use crate::config::BearerToken;
use crate::error::Result;
use crate::models::FileResource;
use crate::upload::UploadTarget;

struct State {
    modified: Timestamp,
    size: u64,
}

/// A remote file. Only metadata is cached; content is fetched per read.
pub struct DriveFile {
    client: DriveClient,
    token: BearerToken,
    id: String,
    created: Timestamp,
    mime_type: String,
    state: Mutex<State>,
}

impl DriveFile {
    pub(crate) fn from_resource(client: DriveClient, token: BearerToken, file: &FileResource) -> Result<Self> {
        Ok(Self {
            client,
            token,
            id: file.id.clone(),
            created: file.created()?,
            mime_type: file.mime_type.clone(),
            state: Mutex::new(State {
                modified: file.modified()?,
                size: file.size.unwrap_or(0),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, file: &FileResource) -> Result<()> {
        let modified = file.modified()?;
        let mut state = self.state();
        state.modified = modified;
        state.size = file.size.unwrap_or(0);
        Ok(())
    }

    /// Bytes `[start, end)`, which must lie within the content.
    async fn fetch(&self, start: u64, end: u64) -> Result<Bytes> {
        if start >= end {
            return Ok(Bytes::new());
        }
        let download = self.client.download(&self.token, &self.id, Some((start, end))).await?;
        let wanted = (end - start) as usize;
        if download.partial {
            let len = download.data.len().min(wanted);
            return Ok(download.data.slice(..len));
        }
        // Full content came back; cut the range out locally.
        let len = download.data.len();
        let from = (start as usize).min(len);
        let to = from.saturating_add(wanted).min(len);
        Ok(download.data.slice(from..to))
    }
}

#[async_trait]
impl File for DriveFile {
    fn created_time(&self) -> Timestamp {
        self.created
    }

    fn modified_time(&self) -> Timestamp {
        self.state().modified
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn size(&self) -> u64 {
        self.state().size
    }

    async fn sync(&self) -> wfs::Result<()> {
        let file = self.client.metadata(&self.token, &self.id).await?;
        self.refresh(&file)?;
        Ok(())
    }

    async fn read_range(&self, start: u64, end: u64) -> wfs::Result<Bytes> {
        let size = self.size();
        Ok(self.fetch(start.min(size), end.min(size)).await?)
    }

    async fn splice(&self, start: u64, end: u64, data: Bytes) -> wfs::Result<u64> {
        let size = self.size();
        let start = start.min(size);
        let end = end.clamp(start, size);
        let (prefix, suffix) = futures::try_join!(self.fetch(0, start), self.fetch(end, size))?;

        let mut content = BytesMut::with_capacity(prefix.len() + data.len() + suffix.len());
        content.extend_from_slice(&prefix);
        content.extend_from_slice(&data);
        content.extend_from_slice(&suffix);
        log_debug!("Rewriting {id} with {size} bytes", id: self.id.as_str(), size: content.len());

        let target = UploadTarget::Update { id: self.id.clone() };
        let file = self
            .client
            .upload(&self.token, &target, &self.mime_type, content.freeze())
            .await?;
        self.refresh(&file)?;
        Ok(self.size())
    }
}
