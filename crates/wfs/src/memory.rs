// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-process driver.
//!
//! Content lives in named volumes for the life of the process. Useful for
//! scratch space and for exercising the resolver without any storage.
//! Mount params are `[volume: string, directory_id: integer = 0]`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};

use crate::dir::{Dir, Directory};
use crate::entry::{self, Children, Entry, EntryInfo, FileType, MountParams, MountRecord, Timestamp};
use crate::error::{Error, Result};
use crate::file::{File, FileHandle};
use crate::options::ChildOptions;
use crate::registry::{self, Driver};
use crate::units::splice_bytes;

pub const DRIVER_NAME: &str = "memory";
pub const MEMORY_MIME: &str = "application/vnd.wfs.memory";

const ROOT_ID: u64 = 0;

static VOLUMES: LazyLock<Mutex<HashMap<String, Arc<Volume>>>> = LazyLock::new(Default::default);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Volume {
    next_id: AtomicU64,
    dirs: Mutex<HashMap<u64, Arc<MemoryDirectory>>>,
}

fn volume(name: &str) -> Arc<Volume> {
    let mut volumes = lock(&VOLUMES);
    volumes
        .entry(name.to_string())
        .or_insert_with(|| {
            let root = Arc::new(MemoryDirectory::empty(name, ROOT_ID, entry::now()));
            Arc::new(Volume {
                next_id: AtomicU64::new(ROOT_ID + 1),
                dirs: Mutex::new(HashMap::from([(ROOT_ID, root)])),
            })
        })
        .clone()
}

#[derive(Clone)]
enum Node {
    File(Arc<MemoryFile>),
    Directory(Arc<MemoryDirectory>),
    Mount { record: MountRecord, created: Timestamp },
}

struct DirState {
    modified: Timestamp,
    entries: BTreeMap<String, Node>,
}

pub struct MemoryDirectory {
    volume: String,
    id: u64,
    created: Timestamp,
    state: Mutex<DirState>,
}

impl MemoryDirectory {
    fn empty(volume: &str, id: u64, created: Timestamp) -> Self {
        Self {
            volume: volume.to_string(),
            id,
            created,
            state: Mutex::new(DirState {
                modified: created,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Open directory `id` of `volume`, creating the volume when needed.
    pub fn mount(parent: Option<Dir>, volume_name: &str, id: u64) -> Result<Dir> {
        let vol = volume(volume_name);
        let node = lock(&vol.dirs).get(&id).cloned().ok_or_else(Error::not_found)?;
        Ok(Dir::new(node, parent))
    }

    fn touch(state: &mut DirState) {
        state.modified = entry::now();
    }

    fn forget(&self, vol: &Volume) {
        let children: Vec<Node> = lock(&self.state).entries.values().cloned().collect();
        for child in children {
            if let Node::Directory(dir) = child {
                dir.forget(vol);
            }
        }
        _ = lock(&vol.dirs).remove(&self.id);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    fn created_time(&self) -> Timestamp {
        self.created
    }

    fn modified_time(&self) -> Timestamp {
        lock(&self.state).modified
    }

    fn mime_type(&self) -> String {
        MEMORY_MIME.to_string()
    }

    fn mount_info(&self) -> MountParams {
        vec![json!(self.volume), json!(self.id)]
    }

    fn children(&self) -> Children {
        let state = lock(&self.state);
        state
            .entries
            .iter()
            .map(|(name, node)| {
                let info = match node {
                    Node::File(file) => EntryInfo {
                        entry_type: FileType::File,
                        mime_type: file.mime_type(),
                        created_time: file.created_time(),
                        modified_time: file.modified_time(),
                        size: Some(file.size()),
                        driver: None,
                    },
                    Node::Directory(dir) => EntryInfo {
                        entry_type: FileType::Directory,
                        mime_type: MEMORY_MIME.to_string(),
                        created_time: dir.created,
                        modified_time: dir.modified_time(),
                        size: None,
                        driver: None,
                    },
                    Node::Mount { record, created } => EntryInfo {
                        entry_type: FileType::Mount,
                        mime_type: registry::mime_type_of(&record.driver)
                            .unwrap_or(entry::INODE_MIME)
                            .to_string(),
                        created_time: *created,
                        modified_time: *created,
                        size: None,
                        driver: Some(record.driver.clone()),
                    },
                };
                (name.clone(), info)
            })
            .collect()
    }

    fn contains(&self, name: &str) -> bool {
        lock(&self.state).entries.contains_key(name)
    }

    async fn sync(&self) -> Result<()> {
        Ok(())
    }

    async fn open_child(&self, this: &Dir, name: &str, options: &ChildOptions) -> Result<Entry> {
        let existing = lock(&self.state).entries.get(name).cloned();
        match existing {
            Some(Node::File(file)) => Ok(Entry::File(FileHandle::new(file))),
            Some(Node::Directory(dir)) => Ok(Entry::Directory(Dir::new(dir, Some(this.clone())))),
            Some(Node::Mount { record, .. }) => {
                let params = record.params_with(&options.params);
                registry::mount(&record.driver, Some(this.clone()), &params)
                    .await
                    .map(Entry::Directory)
            }
            None => {
                let entry = match options.file_type {
                    FileType::File => {
                        let file = Arc::new(MemoryFile {
                            created: options.created_time,
                            mime_type: options.mime_type.clone(),
                            state: Mutex::new(FileState {
                                modified: options.modified_time,
                                content: options.content(),
                            }),
                        });
                        (Node::File(file.clone()), Entry::File(FileHandle::new(file)))
                    }
                    FileType::Directory => {
                        let vol = volume(&self.volume);
                        let id = vol.next_id.fetch_add(1, Ordering::Relaxed);
                        let dir = Arc::new(MemoryDirectory::empty(&self.volume, id, options.created_time));
                        _ = lock(&vol.dirs).insert(id, dir.clone());
                        (
                            Node::Directory(dir.clone()),
                            Entry::Directory(Dir::new(dir, Some(this.clone()))),
                        )
                    }
                    FileType::Mount => {
                        return Err(Error::invalid_argument("mount points are created with mount()"));
                    }
                };
                let mut state = lock(&self.state);
                _ = state.entries.insert(name.to_string(), entry.0);
                Self::touch(&mut state);
                Ok(entry.1)
            }
        }
    }

    async fn remove_child(&self, _this: &Dir, name: &str) -> Result<()> {
        let removed = {
            let mut state = lock(&self.state);
            let removed = state.entries.remove(name).ok_or_else(Error::not_found)?;
            Self::touch(&mut state);
            removed
        };
        if let Node::Directory(dir) = removed {
            dir.forget(&volume(&self.volume));
        }
        Ok(())
    }

    async fn mount_child(&self, name: &str, driver: &str, mounted: &Dir) -> Result<()> {
        let record = MountRecord::new(driver, mounted.mount_info());
        let mut state = lock(&self.state);
        _ = state.entries.insert(
            name.to_string(),
            Node::Mount {
                record,
                created: entry::now(),
            },
        );
        Self::touch(&mut state);
        Ok(())
    }
}

struct FileState {
    modified: Timestamp,
    content: Bytes,
}

pub struct MemoryFile {
    created: Timestamp,
    mime_type: String,
    state: Mutex<FileState>,
}

#[async_trait]
impl File for MemoryFile {
    fn created_time(&self) -> Timestamp {
        self.created
    }

    fn modified_time(&self) -> Timestamp {
        lock(&self.state).modified
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn size(&self) -> u64 {
        lock(&self.state).content.len() as u64
    }

    async fn sync(&self) -> Result<()> {
        Ok(())
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Bytes> {
        let content = lock(&self.state).content.clone();
        let len = content.len();
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(len);
        let end = usize::try_from(end).unwrap_or(usize::MAX).clamp(start, len);
        Ok(content.slice(start..end))
    }

    async fn splice(&self, start: u64, end: u64, data: Bytes) -> Result<u64> {
        let mut state = lock(&self.state);
        state.content = Bytes::from(splice_bytes(&state.content, start, end, &data));
        state.modified = entry::now();
        Ok(state.content.len() as u64)
    }
}

/// Registers the `memory` driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDriver;

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn mime_type(&self) -> &'static str {
        MEMORY_MIME
    }

    async fn mount(&self, parent: Option<Dir>, params: &[Value]) -> Result<Dir> {
        let name = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_argument("memory mount needs a volume name"))?;
        let id = params.get(1).and_then(Value::as_u64).unwrap_or(ROOT_ID);
        MemoryDirectory::mount(parent, name, id)
    }
}
