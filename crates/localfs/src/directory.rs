// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use diagnostics::log_debug;
use serde_json::json;
use wfs::{
    ChildOptions, Children, Dir, Directory, Entry, EntryInfo, Error, FileHandle, FileType,
    INODE_MIME, MountParams, MountRecord, Timestamp,
};

use crate::error::StoreError;
use crate::file::LocalFile;
use crate::store::{Info, NameMap, Row, Store};

struct State {
    modified: Timestamp,
    names: NameMap,
    children: Children,
}

/// A directory row in a local store.
pub struct LocalDirectory {
    store: Arc<Store>,
    key: i64,
    created: Timestamp,
    state: Mutex<State>,
}

impl LocalDirectory {
    /// Open directory `key` of the database at `path`.
    ///
    /// The database and its root directory are created when missing.
    pub async fn mount(parent: Option<Dir>, path: &str, key: i64) -> wfs::Result<Dir> {
        let store = Store::open(path)?;
        store.ensure_root(key)?;
        let row = store.load(key)?;
        let dir = Self::from_row(store, key, row)?;
        Ok(Dir::new(Arc::new(dir), parent))
    }

    fn from_row(store: Arc<Store>, key: i64, row: Row) -> Result<Self, StoreError> {
        let names = row.names(key)?;
        let children = store.children(&names)?;
        Ok(Self {
            store,
            key,
            created: row.info.created,
            state: Mutex::new(State {
                modified: row.info.modified,
                names,
                children,
            }),
        })
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn child_key(&self, name: &str) -> Option<i64> {
        self.state().names.get(name).copied()
    }

    fn record_child(&self, name: &str, key: i64, info: EntryInfo, modified: Timestamp) {
        let mut state = self.state();
        _ = state.names.insert(name.to_string(), key);
        _ = state.children.insert(name.to_string(), info);
        state.modified = modified;
    }

    async fn open_existing(&self, this: &Dir, key: i64, options: &ChildOptions) -> wfs::Result<Entry> {
        let row = self.store.load(key)?;
        match row.info.entry_type {
            FileType::File => {
                let file = LocalFile::from_row(self.store.clone(), key, row);
                Ok(Entry::File(FileHandle::new(Arc::new(file))))
            }
            FileType::Directory => {
                let dir = Self::from_row(self.store.clone(), key, row)?;
                Ok(Entry::Directory(Dir::new(Arc::new(dir), Some(this.clone()))))
            }
            FileType::Mount => {
                let record = MountRecord::from_json(&row.content)?;
                log_debug!("Reopening {driver} mount point {key}", driver: record.driver.as_str(), key: key);
                let params = record.params_with(&options.params);
                wfs::registry::mount(&record.driver, Some(this.clone()), &params)
                    .await
                    .map(Entry::Directory)
            }
        }
    }

    fn create(&self, this: &Dir, name: &str, options: &ChildOptions) -> wfs::Result<Entry> {
        let (info, content) = match options.file_type {
            FileType::File => (
                Info {
                    entry_type: FileType::File,
                    created: options.created_time,
                    modified: options.modified_time,
                    mime_type: Some(options.mime_type.clone()),
                },
                options.content().to_vec(),
            ),
            FileType::Directory => (
                Info {
                    entry_type: FileType::Directory,
                    created: options.created_time,
                    modified: options.modified_time,
                    mime_type: None,
                },
                b"{}".to_vec(),
            ),
            FileType::Mount => {
                return Err(Error::invalid_argument("mount points are created with mount()"));
            }
        };

        let (key, modified) = self.store.create_child(self.key, name, &info, &content)?;
        let size = (info.entry_type == FileType::File).then_some(content.len() as u64);
        let summary = EntryInfo {
            entry_type: info.entry_type,
            mime_type: info.mime_type.clone().unwrap_or_else(|| INODE_MIME.to_string()),
            created_time: info.created,
            modified_time: info.modified,
            size,
            driver: None,
        };
        self.record_child(name, key, summary, modified);

        let row = Row { info, content };
        Ok(match row.info.entry_type {
            FileType::File => Entry::File(FileHandle::new(Arc::new(LocalFile::from_row(
                self.store.clone(),
                key,
                row,
            )))),
            _ => {
                let dir = Self::from_row(self.store.clone(), key, row)?;
                Entry::Directory(Dir::new(Arc::new(dir), Some(this.clone())))
            }
        })
    }
}

#[async_trait]
impl Directory for LocalDirectory {
    fn created_time(&self) -> Timestamp {
        self.created
    }

    fn modified_time(&self) -> Timestamp {
        self.state().modified
    }

    fn mime_type(&self) -> String {
        INODE_MIME.to_string()
    }

    fn mount_info(&self) -> MountParams {
        vec![json!(self.store.path()), json!(self.key)]
    }

    fn children(&self) -> Children {
        self.state().children.clone()
    }

    fn contains(&self, name: &str) -> bool {
        self.state().names.contains_key(name)
    }

    async fn sync(&self) -> wfs::Result<()> {
        let row = self.store.load(self.key)?;
        let names = row.names(self.key)?;
        let children = self.store.children(&names)?;
        let mut state = self.state();
        state.modified = row.info.modified;
        state.names = names;
        state.children = children;
        Ok(())
    }

    async fn open_child(&self, this: &Dir, name: &str, options: &ChildOptions) -> wfs::Result<Entry> {
        match self.child_key(name) {
            Some(key) => self.open_existing(this, key, options).await,
            None => self.create(this, name, options),
        }
    }

    async fn remove_child(&self, _this: &Dir, name: &str) -> wfs::Result<()> {
        let modified = self.store.remove_child(self.key, name)?;
        let mut state = self.state();
        _ = state.names.remove(name);
        _ = state.children.remove(name);
        state.modified = modified;
        Ok(())
    }

    async fn mount_child(&self, name: &str, driver: &str, mounted: &Dir) -> wfs::Result<()> {
        let record = MountRecord::new(driver, mounted.mount_info());
        let now = wfs::now();
        let info = Info {
            entry_type: FileType::Mount,
            created: now,
            modified: now,
            mime_type: Some(mounted.mime_type()),
        };
        let (key, modified) = self.store.create_child(self.key, name, &info, &record.to_json()?)?;
        let summary = EntryInfo {
            entry_type: FileType::Mount,
            mime_type: wfs::registry::mime_type_of(driver)
                .map(str::to_string)
                .unwrap_or_else(|| mounted.mime_type()),
            created_time: now,
            modified_time: now,
            size: None,
            driver: Some(driver.to_string()),
        };
        self.record_child(name, key, summary, modified);
        Ok(())
    }
}
