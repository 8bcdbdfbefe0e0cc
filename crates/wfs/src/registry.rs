// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Process-wide table of storage drivers.
//!
//! The table is built once at startup and never changes afterwards:
//!
//! ```ignore
//! Registry::builder()
//!     .driver(LocalDriver)
//!     .driver(DriveDriver::new(DriveConfig::default())?)
//!     .install()?;
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use diagnostics::log_info;
use serde_json::Value;

use crate::dir::Dir;
use crate::error::{Error, Result};

/// A storage backend that can be mounted into the namespace.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Marker type of the driver's directories.
    fn mime_type(&self) -> &'static str;

    /// Open the directory described by `params` with `parent` as its parent.
    async fn mount(&self, parent: Option<Dir>, params: &[Value]) -> Result<Dir>;
}

pub struct Registry {
    drivers: BTreeMap<&'static str, Arc<dyn Driver>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    drivers: BTreeMap<&'static str, Arc<dyn Driver>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

impl RegistryBuilder {
    #[must_use]
    pub fn driver(mut self, driver: impl Driver + 'static) -> Self {
        let driver: Arc<dyn Driver> = Arc::new(driver);
        _ = self.drivers.insert(driver.name(), driver);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            drivers: self.drivers,
        }
    }

    /// Make this the process registry. Fails if one is already installed.
    pub fn install(self) -> Result<&'static Registry> {
        let names = self.drivers.keys().copied().collect::<Vec<_>>().join(",");
        REGISTRY
            .set(self.build())
            .map_err(|_| Error::already_installed())?;
        log_info!("Installed drivers {names}", names: names);
        REGISTRY.get().ok_or_else(Error::already_installed)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.drivers.keys()).finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Driver>> {
        self.drivers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.drivers.keys().copied()
    }

    pub fn mime_type_of(&self, name: &str) -> Option<&'static str> {
        self.get(name).map(|d| d.mime_type())
    }

    pub fn driver_for_mime(&self, mime_type: &str) -> Option<&'static str> {
        self.drivers
            .values()
            .find(|d| d.mime_type() == mime_type)
            .map(|d| d.name())
    }
}

/// The installed registry, if any.
pub fn installed() -> Option<&'static Registry> {
    REGISTRY.get()
}

pub fn lookup(name: &str) -> Result<Arc<dyn Driver>> {
    installed()
        .and_then(|r| r.get(name))
        .cloned()
        .ok_or_else(|| Error::unknown_driver(name))
}

pub fn contains(name: &str) -> bool {
    installed().is_some_and(|r| r.contains(name))
}

pub fn mime_type_of(name: &str) -> Option<&'static str> {
    installed().and_then(|r| r.mime_type_of(name))
}

pub fn driver_for_mime(mime_type: &str) -> Option<&'static str> {
    installed().and_then(|r| r.driver_for_mime(mime_type))
}

/// Mount a directory through the named driver.
///
/// Whatever the driver reports, the returned handle has type `mount`.
pub async fn mount(driver: &str, parent: Option<Dir>, params: &[Value]) -> Result<Dir> {
    let imp = lookup(driver)?;
    let dir = imp.mount(parent, params).await?;
    log_info!("Mounted {driver}", driver: driver);
    Ok(dir.to_mount())
}
