// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use diagnostics::log_debug;
use serde_json::json;
use wfs::{
    ChildOptions, Children, Dir, Directory, Entry, EntryInfo, Error, FileHandle, FileType,
    INODE_MIME, MountParams, MountRecord, Timestamp,
};

use crate::client::DriveClient;
use crate::config::BearerToken;
use crate::error::{DriveError, Result};
use crate::file::DriveFile;
use crate::models::{FOLDER_MIME, FileResource};
use crate::upload::UploadTarget;

/// Property on a mount point naming the driver it mounts.
pub const DRIVER_PROPERTY: &str = "driver";

struct State {
    modified: Timestamp,
    /// Listing by name. When names repeat the first listed file wins.
    files: BTreeMap<String, FileResource>,
    children: Children,
}

/// A remote folder.
pub struct DriveDirectory {
    client: DriveClient,
    token: BearerToken,
    folder_id: String,
    created: Timestamp,
    state: Mutex<State>,
}

impl DriveDirectory {
    /// Open folder `folder_id` with `token` as the credential for every request.
    pub async fn mount(
        parent: Option<Dir>,
        client: DriveClient,
        folder_id: &str,
        token: BearerToken,
    ) -> wfs::Result<Dir> {
        let folder = client.metadata(&token, folder_id).await?;
        if !folder.is_folder() {
            return Err(DriveError::NotAFolder { name: folder.name }.into());
        }
        let dir = Self::load(client, token, &folder).await?;
        Ok(Dir::new(Arc::new(dir), parent))
    }

    async fn load(client: DriveClient, token: BearerToken, folder: &FileResource) -> Result<Self> {
        let listing = client.list_children(&token, &folder.id).await?;
        Self::with_listing(client, token, folder, listing)
    }

    fn with_listing(
        client: DriveClient,
        token: BearerToken,
        folder: &FileResource,
        listing: Vec<FileResource>,
    ) -> Result<Self> {
        let files = index(listing);
        let children = summarize(&files)?;
        Ok(Self {
            client,
            token,
            folder_id: folder.id.clone(),
            created: folder.created()?,
            state: Mutex::new(State {
                modified: folder.modified()?,
                files,
                children,
            }),
        })
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, name: &str, file: FileResource) -> Result<()> {
        let info = entry_info(&file)?;
        let mut state = self.state();
        _ = state.files.insert(name.to_string(), file);
        _ = state.children.insert(name.to_string(), info);
        state.modified = wfs::now();
        Ok(())
    }

    async fn open_existing(&self, this: &Dir, file: FileResource, options: &ChildOptions) -> wfs::Result<Entry> {
        if file.is_folder() {
            let dir = Self::load(self.client.clone(), self.token.clone(), &file).await?;
            return Ok(Entry::Directory(Dir::new(Arc::new(dir), Some(this.clone()))));
        }
        if file.is_mount_point() {
            let record = self.read_mount_point(&file).await?;
            log_debug!("Reopening {driver} mount point {id}", driver: record.driver.as_str(), id: file.id.as_str());
            let params = record.params_with(&options.params);
            return wfs::registry::mount(&record.driver, Some(this.clone()), &params)
                .await
                .map(Entry::Directory);
        }
        let handle = DriveFile::from_resource(self.client.clone(), self.token.clone(), &file)?;
        Ok(Entry::File(FileHandle::new(Arc::new(handle))))
    }

    async fn read_mount_point(&self, file: &FileResource) -> Result<MountRecord> {
        let download = self.client.download(&self.token, &file.id, None).await?;
        match download.content_type.as_deref() {
            Some(content_type) if content_type.starts_with(INODE_MIME) => {}
            other => {
                return Err(DriveError::InvalidMountPoint(format!(
                    "{} has content type {}",
                    file.name,
                    other.unwrap_or("(none)")
                )));
            }
        }
        Ok(MountRecord::from_json(&download.data)?)
    }

    async fn create(&self, this: &Dir, name: &str, options: &ChildOptions) -> wfs::Result<Entry> {
        match options.file_type {
            FileType::File => {
                let target = UploadTarget::Create {
                    parent: self.folder_id.clone(),
                    name: name.to_string(),
                    properties: BTreeMap::new(),
                    created: Some(options.created_time),
                    modified: Some(options.modified_time),
                };
                let file = self
                    .client
                    .upload(&self.token, &target, &options.mime_type, options.content())
                    .await?;
                let handle = DriveFile::from_resource(self.client.clone(), self.token.clone(), &file)?;
                self.record(name, file)?;
                Ok(Entry::File(FileHandle::new(Arc::new(handle))))
            }
            FileType::Directory => {
                let folder = self.client.create_folder(&self.token, &self.folder_id, name).await?;
                let dir = Self::with_listing(self.client.clone(), self.token.clone(), &folder, Vec::new())?;
                self.record(name, folder)?;
                Ok(Entry::Directory(Dir::new(Arc::new(dir), Some(this.clone()))))
            }
            FileType::Mount => Err(Error::invalid_argument("mount points are created with mount()")),
        }
    }
}

fn index(listing: Vec<FileResource>) -> BTreeMap<String, FileResource> {
    let mut files = BTreeMap::new();
    for file in listing {
        _ = files.entry(file.name.clone()).or_insert(file);
    }
    files
}

fn summarize(files: &BTreeMap<String, FileResource>) -> Result<Children> {
    files
        .iter()
        .map(|(name, file)| Ok((name.clone(), entry_info(file)?)))
        .collect()
}

fn entry_info(file: &FileResource) -> Result<EntryInfo> {
    let created_time = file.created()?;
    let modified_time = file.modified()?;
    Ok(if file.is_folder() {
        EntryInfo {
            entry_type: FileType::Directory,
            mime_type: FOLDER_MIME.to_string(),
            created_time,
            modified_time,
            size: None,
            driver: None,
        }
    } else if file.is_mount_point() {
        let driver = file.properties.get(DRIVER_PROPERTY).cloned();
        let mime_type = driver
            .as_deref()
            .and_then(wfs::registry::mime_type_of)
            .unwrap_or(INODE_MIME);
        EntryInfo {
            entry_type: FileType::Mount,
            mime_type: mime_type.to_string(),
            created_time,
            modified_time,
            size: None,
            driver,
        }
    } else {
        EntryInfo {
            entry_type: FileType::File,
            mime_type: file.mime_type.clone(),
            created_time,
            modified_time,
            size: Some(file.size.unwrap_or(0)),
            driver: None,
        }
    })
}

#[async_trait]
impl Directory for DriveDirectory {
    fn created_time(&self) -> Timestamp {
        self.created
    }

    fn modified_time(&self) -> Timestamp {
        self.state().modified
    }

    fn mime_type(&self) -> String {
        FOLDER_MIME.to_string()
    }

    fn mount_info(&self) -> MountParams {
        vec![json!(self.folder_id)]
    }

    fn children(&self) -> Children {
        self.state().children.clone()
    }

    fn contains(&self, name: &str) -> bool {
        self.state().files.contains_key(name)
    }

    async fn sync(&self) -> wfs::Result<()> {
        let folder = self.client.metadata(&self.token, &self.folder_id).await?;
        let listing = self.client.list_children(&self.token, &self.folder_id).await?;
        let files = index(listing);
        let children = summarize(&files)?;
        let modified = folder.modified()?;
        let mut state = self.state();
        state.modified = modified;
        state.files = files;
        state.children = children;
        Ok(())
    }

    async fn open_child(&self, this: &Dir, name: &str, options: &ChildOptions) -> wfs::Result<Entry> {
        let existing = self.state().files.get(name).cloned();
        match existing {
            Some(file) => self.open_existing(this, file, options).await,
            None => self.create(this, name, options).await,
        }
    }

    async fn remove_child(&self, _this: &Dir, name: &str) -> wfs::Result<()> {
        let id = self
            .state()
            .files
            .get(name)
            .map(|f| f.id.clone())
            .ok_or_else(Error::not_found)?;
        self.client.delete(&self.token, &id).await?;
        let mut state = self.state();
        _ = state.files.remove(name);
        _ = state.children.remove(name);
        state.modified = wfs::now();
        Ok(())
    }

    async fn mount_child(&self, name: &str, driver: &str, mounted: &Dir) -> wfs::Result<()> {
        let record = MountRecord::new(driver, mounted.mount_info());
        let now = wfs::now();
        let target = UploadTarget::Create {
            parent: self.folder_id.clone(),
            name: name.to_string(),
            properties: BTreeMap::from([(DRIVER_PROPERTY.to_string(), driver.to_string())]),
            created: Some(now),
            modified: Some(now),
        };
        let file = self
            .client
            .upload(&self.token, &target, INODE_MIME, record.to_json()?.into())
            .await?;
        self.record(name, file)?;
        Ok(())
    }
}
