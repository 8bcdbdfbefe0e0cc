// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::entry::{Children, Entry, FileType, MountParams, Timestamp};
use crate::error::Result;
use crate::options::ChildOptions;

/// Backend side of a directory.
///
/// The resolver has already checked existence, permissions and name
/// conflicts before any of the `*_child` primitives is called. `this` is the
/// handle the resolver is working through; drivers use it as the parent of
/// the entries they return.
#[async_trait]
pub trait Directory: Send + Sync {
    fn created_time(&self) -> Timestamp;

    fn modified_time(&self) -> Timestamp;

    /// The driver's directory marker type.
    fn mime_type(&self) -> String;

    /// Parameters that mount this directory again on its own.
    fn mount_info(&self) -> MountParams;

    fn children(&self) -> Children;

    fn contains(&self, name: &str) -> bool {
        self.children().contains_key(name)
    }

    /// Reload state from the backend.
    async fn sync(&self) -> Result<()>;

    /// Open `name` if it exists, otherwise create it from `options`.
    async fn open_child(&self, this: &Dir, name: &str, options: &ChildOptions) -> Result<Entry>;

    async fn remove_child(&self, this: &Dir, name: &str) -> Result<()>;

    /// Persist a mount point for `mounted` under `name`.
    async fn mount_child(&self, name: &str, driver: &str, mounted: &Dir) -> Result<()>;
}

pub type CreateHook = Arc<dyn Fn(&Entry, &str) + Send + Sync>;
pub type RemoveHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Hooks {
    on_create: Option<CreateHook>,
    on_remove: Option<RemoveHook>,
}

struct Inner {
    node: Arc<dyn Directory>,
    parent: Option<Dir>,
    entry_type: FileType,
    read_only: bool,
    hooks: Mutex<Hooks>,
}

/// Handle to an open directory.
///
/// Cloning is cheap and clones share hooks. The parent link only points
/// upward, so handles never form cycles.
#[derive(Clone)]
pub struct Dir(Arc<Inner>);

impl Dir {
    pub fn new(node: Arc<dyn Directory>, parent: Option<Dir>) -> Self {
        Self::with(node, parent, FileType::Directory, false)
    }

    fn with(node: Arc<dyn Directory>, parent: Option<Dir>, entry_type: FileType, read_only: bool) -> Self {
        Self(Arc::new(Inner {
            node,
            parent,
            entry_type,
            read_only,
            hooks: Mutex::new(Hooks::default()),
        }))
    }

    pub(crate) fn to_mount(&self) -> Self {
        Self::with(
            self.0.node.clone(),
            self.0.parent.clone(),
            FileType::Mount,
            self.0.read_only,
        )
    }

    pub(crate) fn to_read_only(&self) -> Self {
        if self.0.read_only {
            return self.clone();
        }
        Self::with(
            self.0.node.clone(),
            self.0.parent.clone(),
            self.0.entry_type,
            true,
        )
    }

    /// Backend object behind this handle.
    pub fn node(&self) -> &Arc<dyn Directory> {
        &self.0.node
    }

    pub fn parent(&self) -> Option<&Dir> {
        self.0.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Follow parent links to the top of the namespace.
    pub fn root(&self) -> Dir {
        let mut dir = self;
        while let Some(parent) = dir.parent() {
            dir = parent;
        }
        dir.clone()
    }

    pub fn entry_type(&self) -> FileType {
        self.0.entry_type
    }

    pub fn is_read_only(&self) -> bool {
        self.0.read_only
    }

    /// Whether both handles refer to the same backend directory object.
    pub fn same_node(&self, other: &Dir) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0.node), Arc::as_ptr(&other.0.node))
    }

    pub fn created_time(&self) -> Timestamp {
        self.0.node.created_time()
    }

    pub fn modified_time(&self) -> Timestamp {
        self.0.node.modified_time()
    }

    pub fn mime_type(&self) -> String {
        self.0.node.mime_type()
    }

    pub fn mount_info(&self) -> MountParams {
        self.0.node.mount_info()
    }

    pub fn children(&self) -> Children {
        self.0.node.children()
    }

    pub async fn sync(&self) -> Result<()> {
        self.0.node.sync().await
    }

    /// Called with the new entry and its name whenever a child is created
    /// or mounted through this handle.
    pub fn on_create(&self, hook: impl Fn(&Entry, &str) + Send + Sync + 'static) {
        self.hooks().on_create = Some(Arc::new(hook));
    }

    /// Called with the child's name whenever a child is removed through this handle.
    pub fn on_remove(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.hooks().on_remove = Some(Arc::new(hook));
    }

    fn hooks(&self) -> std::sync::MutexGuard<'_, Hooks> {
        self.0.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify_created(&self, entry: &Entry, name: &str) {
        let hook = self.hooks().on_create.clone();
        if let Some(hook) = hook {
            hook(entry, name);
        }
    }

    pub(crate) fn notify_removed(&self, name: &str) {
        let hook = self.hooks().on_remove.clone();
        if let Some(hook) = hook {
            hook(name);
        }
    }
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dir")
            .field("type", &self.0.entry_type)
            .field("mime_type", &self.0.node.mime_type())
            .field("mount_info", &self.0.node.mount_info())
            .field("read_only", &self.0.read_only)
            .finish()
    }
}
