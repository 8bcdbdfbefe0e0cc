// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path resolution: `open`, `remove` and `mount` on a [`Dir`].
//!
//! Each call consumes the first component of the path in the current
//! directory and recurses into the next directory with the rest. Errors are
//! annotated on the way back out, so the outermost caller sees both where the
//! failure happened and how much of the path was left.

use std::future::Future;
use std::pin::Pin;

use diagnostics::{log_debug, log_info};
use serde_json::Value;

use crate::dir::Dir;
use crate::entry::{Entry, MountParams};
use crate::error::{Error, Result};
use crate::options::{ChildOptions, OpenOptions};
use crate::path;
use crate::registry;

type Step<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

impl Dir {
    /// Open or create the entry at `path`.
    ///
    /// An empty path returns this directory. A leading `/` starts from the
    /// root of the namespace. Intermediate components must already exist.
    pub async fn open(&self, path: &str, mut options: OpenOptions) -> Result<Entry> {
        let on_error = options.take_error_handler();
        let result = match options.resolve(self).await {
            Ok(options) => self.open_at(path, &options).await,
            Err(err) => Err(err),
        };
        match (result, on_error) {
            (Err(err), Some(handler)) => handler(err),
            (result, _) => result,
        }
    }

    fn open_at<'a>(&'a self, path: &'a str, options: &'a ChildOptions) -> Step<'a, Entry> {
        Box::pin(async move {
            if path::is_absolute(path) && !self.is_root() {
                return self.root().open_at(path, options).await;
            }
            let split = path::split(path);
            let name = split.name.unwrap_or("");
            self.open_step(split.name, &split.rest, options)
                .await
                .map_err(|e| e.annotate(self, name, &split.rest))
        })
    }

    async fn open_step(&self, name: Option<&str>, rest: &str, options: &ChildOptions) -> Result<Entry> {
        let Some(name) = name else {
            return Ok(Entry::Directory(self.clone()));
        };
        if name == ".." {
            return self.parent_or_self().open_at(rest, options).await;
        }

        let exists = self.node().contains(name);
        if !rest.is_empty() {
            if !exists {
                return Err(Error::not_found());
            }
            log_debug!("Traversing {name}", name: name);
            let next = self.open_existing_dir(name, options).await?;
            return next.open_at(rest, options).await;
        }

        match (exists, options.open_existing) {
            (false, true) => Err(Error::not_found()),
            (true, false) => Err(Error::name_conflict()),
            (true, true) => {
                log_debug!("Opening {name}", name: name);
                let entry = self.node().open_child(self, name, options).await?;
                Ok(self.inherit(entry, options.read_only))
            }
            (false, false) => {
                if self.is_read_only() {
                    return Err(Error::permission_denied("directory is read-only"));
                }
                log_debug!("Creating {file_type} {name}", file_type: options.file_type.as_str(), name: name);
                let entry = self.node().open_child(self, name, options).await?;
                let entry = self.inherit(entry, options.read_only);
                self.notify_created(&entry, name);
                Ok(entry)
            }
        }
    }

    /// Remove the entry at `path`.
    ///
    /// Mount points are unlinked; the mounted storage is left alone.
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.remove_at(path).await
    }

    fn remove_at<'a>(&'a self, path: &'a str) -> Step<'a, ()> {
        Box::pin(async move {
            if path::is_absolute(path) && !self.is_root() {
                return self.root().remove_at(path).await;
            }
            let split = path::split(path);
            let name = split.name.unwrap_or("");
            self.remove_step(split.name, &split.rest)
                .await
                .map_err(|e| e.annotate(self, name, &split.rest))
        })
    }

    async fn remove_step(&self, name: Option<&str>, rest: &str) -> Result<()> {
        let Some(name) = name else {
            return Err(Error::root_target("remove"));
        };
        if name == ".." {
            return self.parent_or_self().remove_at(rest).await;
        }
        if !self.node().contains(name) {
            return Err(Error::not_found());
        }
        if !rest.is_empty() {
            let next = self.open_existing_dir(name, &ChildOptions::existing()).await?;
            return next.remove_at(rest).await;
        }
        if self.is_read_only() {
            return Err(Error::permission_denied("directory is read-only"));
        }
        self.node().remove_child(self, name).await?;
        log_info!("Removed {name}", name: name);
        self.notify_removed(name);
        Ok(())
    }

    /// Mount a directory of `driver` at `path` and persist the mount point.
    pub async fn mount(&self, path: &str, driver: &str, params: MountParams) -> Result<Dir> {
        if !registry::contains(driver) {
            return Err(Error::unknown_driver(driver));
        }
        self.mount_at(path, driver, &params).await
    }

    fn mount_at<'a>(&'a self, path: &'a str, driver: &'a str, params: &'a [Value]) -> Step<'a, Dir> {
        Box::pin(async move {
            if path::is_absolute(path) && !self.is_root() {
                return self.root().mount_at(path, driver, params).await;
            }
            let split = path::split(path);
            let name = split.name.unwrap_or("");
            self.mount_step(split.name, &split.rest, driver, params)
                .await
                .map_err(|e| e.annotate(self, name, &split.rest))
        })
    }

    async fn mount_step(&self, name: Option<&str>, rest: &str, driver: &str, params: &[Value]) -> Result<Dir> {
        let Some(name) = name else {
            return Err(Error::root_target("mount"));
        };
        if name == ".." {
            return self.parent_or_self().mount_at(rest, driver, params).await;
        }
        let exists = self.node().contains(name);
        if !rest.is_empty() {
            if !exists {
                return Err(Error::not_found());
            }
            let next = self.open_existing_dir(name, &ChildOptions::existing()).await?;
            return next.mount_at(rest, driver, params).await;
        }
        if exists {
            return Err(Error::name_conflict());
        }
        if self.is_read_only() {
            return Err(Error::permission_denied("directory is read-only"));
        }
        let mounted = registry::mount(driver, Some(self.clone()), params).await?;
        self.node().mount_child(name, driver, &mounted).await?;
        log_info!("Mounted {driver} at {name}", driver: driver, name: name);
        self.notify_created(&Entry::Directory(mounted.clone()), name);
        Ok(mounted)
    }

    /// Copy an entry. Not supported by any driver.
    pub async fn copy(&self, _from: &str, _to: &str) -> Result<Entry> {
        Err(Error::unimplemented("copy"))
    }

    /// Move an entry. Not supported by any driver.
    pub async fn move_entry(&self, _from: &str, _to: &str) -> Result<Entry> {
        Err(Error::unimplemented("move"))
    }

    fn parent_or_self(&self) -> Dir {
        self.parent().cloned().unwrap_or_else(|| self.clone())
    }

    async fn open_existing_dir(&self, name: &str, options: &ChildOptions) -> Result<Dir> {
        let entry = self.node().open_child(self, name, options).await?;
        self.inherit(entry, false).into_dir()
    }

    /// Entries seen through a read-only handle are read-only too.
    fn inherit(&self, entry: Entry, read_only: bool) -> Entry {
        if read_only || self.is_read_only() {
            entry.into_read_only()
        } else {
            entry
        }
    }
}
