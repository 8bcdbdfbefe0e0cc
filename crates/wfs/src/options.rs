// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;

use crate::dir::Dir;
use crate::entry::{self, Entry, FileType, MountParams, Timestamp};
use crate::error::{Error, Result};

/// Content that is still being produced when `open` is called.
pub type PendingData = Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

/// Replaces the outcome of a failed `open`.
pub type ErrorHandler = Arc<dyn Fn(Error) -> Result<Entry> + Send + Sync>;

enum DataPart {
    Ready(Bytes),
    Pending(PendingData),
}

/// How [`Dir::open`] should treat the target.
///
/// ```ignore
/// let file = root
///     .open("notes.txt", OpenOptions::create().data("hello"))
///     .await?
///     .into_file()?;
/// ```
pub struct OpenOptions {
    open_existing: bool,
    file_type: FileType,
    mime_type: Option<String>,
    data: Vec<DataPart>,
    created_time: Option<Timestamp>,
    modified_time: Option<Timestamp>,
    read_only: bool,
    params: MountParams,
    on_error: Option<ErrorHandler>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            open_existing: true,
            file_type: FileType::File,
            mime_type: None,
            data: Vec::new(),
            created_time: None,
            modified_time: None,
            read_only: false,
            params: Vec::new(),
            on_error: None,
        }
    }
}

impl OpenOptions {
    /// Open an existing entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entry; fails if the name is taken.
    pub fn create() -> Self {
        Self::default().open_existing(false)
    }

    pub fn open_existing(mut self, open_existing: bool) -> Self {
        self.open_existing = open_existing;
        self
    }

    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn directory(self) -> Self {
        self.file_type(FileType::Directory)
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Append a content part. Parts are concatenated in order.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data.push(DataPart::Ready(data.into()));
        self
    }

    /// Append a content part that is awaited before the entry is created.
    pub fn pending_data(mut self, data: impl Future<Output = Result<Bytes>> + Send + 'static) -> Self {
        self.data.push(DataPart::Pending(Box::pin(data)));
        self
    }

    pub fn created_time(mut self, time: Timestamp) -> Self {
        self.created_time = Some(time);
        self
    }

    pub fn modified_time(mut self, time: Timestamp) -> Self {
        self.modified_time = Some(time);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Extra parameters appended to stored ones when a mount point is reopened.
    pub fn params(mut self, params: MountParams) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, param: impl Into<serde_json::Value>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Handle a failed open. Only the outermost call invokes the handler.
    pub fn on_error(mut self, handler: impl Fn(Error) -> Result<Entry> + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub(crate) fn take_error_handler(&mut self) -> Option<ErrorHandler> {
        self.on_error.take()
    }

    /// Fill defaults relative to `dir` and await pending content.
    pub(crate) async fn resolve(self, dir: &Dir) -> Result<ChildOptions> {
        if self.file_type == FileType::Mount {
            return Err(Error::invalid_argument("mount points are created with mount(), not open()"));
        }
        let mime_type = match (self.mime_type, self.file_type) {
            (Some(mime), _) => mime,
            (None, FileType::Directory) => dir.mime_type(),
            (None, _) => entry::TEXT_PLAIN.to_string(),
        };
        let now = entry::now();
        let data = try_join_all(self.data.into_iter().map(|part| async move {
            match part {
                DataPart::Ready(bytes) => Ok(bytes),
                DataPart::Pending(pending) => pending.await,
            }
        }))
        .await?;
        Ok(ChildOptions {
            open_existing: self.open_existing,
            file_type: self.file_type,
            mime_type,
            data,
            created_time: self.created_time.unwrap_or(now),
            modified_time: self.modified_time.unwrap_or(now),
            read_only: self.read_only,
            params: self.params,
        })
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("open_existing", &self.open_existing)
            .field("file_type", &self.file_type)
            .field("mime_type", &self.mime_type)
            .field("parts", &self.data.len())
            .field("read_only", &self.read_only)
            .field("params", &self.params.len())
            .finish()
    }
}

/// Fully resolved open options, as handed to drivers.
#[derive(Debug, Clone)]
pub struct ChildOptions {
    pub open_existing: bool,
    pub file_type: FileType,
    pub mime_type: String,
    pub data: Vec<Bytes>,
    pub created_time: Timestamp,
    pub modified_time: Timestamp,
    pub read_only: bool,
    pub params: MountParams,
}

impl ChildOptions {
    /// Options for opening an existing entry on the way to somewhere else.
    pub fn existing() -> Self {
        let now = entry::now();
        Self {
            open_existing: true,
            file_type: FileType::File,
            mime_type: entry::TEXT_PLAIN.to_string(),
            data: Vec::new(),
            created_time: now,
            modified_time: now,
            read_only: false,
            params: Vec::new(),
        }
    }

    /// All content parts joined.
    pub fn content(&self) -> Bytes {
        match self.data.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            parts => {
                let mut out = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
                for part in parts {
                    out.extend_from_slice(part);
                }
                out.freeze()
            }
        }
    }
}
