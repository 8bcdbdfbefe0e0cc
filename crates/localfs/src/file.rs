// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use wfs::{File, TEXT_PLAIN, Timestamp};

use crate::store::{Row, Store};

struct State {
    modified: Timestamp,
    content: Bytes,
}

/// A file row in a local store. Content is cached and written through.
pub struct LocalFile {
    store: Arc<Store>,
    key: i64,
    created: Timestamp,
    mime_type: String,
    state: Mutex<State>,
}

impl LocalFile {
    pub(crate) fn from_row(store: Arc<Store>, key: i64, row: Row) -> Self {
        Self {
            store,
            key,
            created: row.info.created,
            mime_type: row.info.mime_type.unwrap_or_else(|| TEXT_PLAIN.to_string()),
            state: Mutex::new(State {
                modified: row.info.modified,
                content: Bytes::from(row.content),
            }),
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl File for LocalFile {
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
        self.state().content.len() as u64
    }

    async fn sync(&self) -> wfs::Result<()> {
        let row = self.store.load(self.key)?;
        let mut state = self.state();
        state.modified = row.info.modified;
        state.content = Bytes::from(row.content);
        Ok(())
    }

    async fn read_range(&self, start: u64, end: u64) -> wfs::Result<Bytes> {
        let content = self.state().content.clone();
        let len = content.len();
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(len);
        let end = usize::try_from(end).unwrap_or(usize::MAX).clamp(start, len);
        Ok(content.slice(start..end))
    }

    async fn splice(&self, start: u64, end: u64, data: Bytes) -> wfs::Result<u64> {
        let current = self.state().content.clone();
        let content = wfs::units::splice_bytes(&current, start, end, &data);
        let modified = wfs::now();
        self.store.write_content(self.key, &content, &modified)?;
        let mut state = self.state();
        state.modified = modified;
        state.content = Bytes::from(content);
        Ok(state.content.len() as u64)
    }
}
