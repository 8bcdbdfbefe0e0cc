// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entry::{FileType, Timestamp};
use crate::error::{Error, Result};
use crate::units::{self, Unit, Units};

/// Backend side of a file.
///
/// Ranges are byte offsets. Implementations clip reads to the content and
/// persist a splice before returning.
#[async_trait]
pub trait File: Send + Sync {
    fn created_time(&self) -> Timestamp;

    fn modified_time(&self) -> Timestamp;

    fn mime_type(&self) -> String;

    /// Content size in bytes.
    fn size(&self) -> u64;

    /// Reload metadata from the backend.
    async fn sync(&self) -> Result<()>;

    async fn read_range(&self, start: u64, end: u64) -> Result<Bytes>;

    /// Replace bytes `[start, end)` with `data` and return the new size in bytes.
    async fn splice(&self, start: u64, end: u64, data: Bytes) -> Result<u64>;
}

/// Content read as a whole, tagged with the file's mime type.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Bytes,
}

/// Handle to an open file.
#[derive(Clone)]
pub struct FileHandle {
    inner: Arc<dyn File>,
    read_only: bool,
}

impl FileHandle {
    pub fn new(inner: Arc<dyn File>) -> Self {
        Self {
            inner,
            read_only: false,
        }
    }

    pub(crate) fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn entry_type(&self) -> FileType {
        FileType::File
    }

    pub fn created_time(&self) -> Timestamp {
        self.inner.created_time()
    }

    pub fn modified_time(&self) -> Timestamp {
        self.inner.modified_time()
    }

    pub fn mime_type(&self) -> String {
        self.inner.mime_type()
    }

    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    pub async fn sync(&self) -> Result<()> {
        self.inner.sync().await
    }

    /// Read up to `count` elements starting at element `offset` into `buf`.
    ///
    /// `count` defaults to the buffer length. Returns the number of elements read.
    pub async fn read<T: Unit>(&self, buf: &mut [T], offset: u64, count: Option<u64>) -> Result<u64> {
        let width = T::WIDTH as u64;
        let count = count.unwrap_or(buf.len() as u64).min(buf.len() as u64);
        let start = offset.saturating_mul(width);
        let end = start.saturating_add(count.saturating_mul(width));
        let bytes = self.inner.read_range(start, end).await?;
        Ok(units::fill(buf, &bytes))
    }

    /// Byte addressed read. `count` defaults to the rest of the file.
    pub async fn read_blob(&self, offset: u64, count: Option<u64>) -> Result<Blob> {
        let end = match count {
            Some(count) => offset.saturating_add(count),
            None => self.size().max(offset),
        };
        let data = self.inner.read_range(offset, end).await?;
        Ok(Blob {
            mime_type: self.mime_type(),
            data,
        })
    }

    pub async fn read_to_string(&self) -> Result<String> {
        let blob = self.read_blob(0, None).await?;
        String::from_utf8(blob.data.to_vec())
            .map_err(|e| Error::invalid_argument(format!("content is not UTF-8: {e}")))
    }

    /// Overwrite `count` elements at element `offset` with `data`.
    ///
    /// The replaced byte range is `[offset * w, offset * w + count * w)` where
    /// `w` is the element width of `data`; `count` defaults to the rest of the
    /// file. Returns the new size in elements.
    pub async fn write<B: Units + ?Sized>(&self, data: &B, offset: u64, count: Option<u64>) -> Result<u64> {
        if self.read_only {
            return Err(Error::permission_denied("file is read-only"));
        }
        let width = data.unit_width().max(1) as u64;
        let start = offset.saturating_mul(width);
        let end = match count {
            Some(count) => start.saturating_add(count.saturating_mul(width)),
            None => self.size().max(start),
        };
        let size = self.inner.splice(start, end, data.to_bytes()).await?;
        Ok(size / width)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("mime_type", &self.inner.mime_type())
            .field("size", &self.inner.size())
            .field("read_only", &self.read_only)
            .finish()
    }
}
