// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

mod resolve;

use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dir::Dir;
use crate::memory::{MemoryDirectory, MemoryDriver};
use crate::registry::Registry;

static INSTALL: Once = Once::new();
static VOLUME: AtomicUsize = AtomicUsize::new(0);

/// Install the test registry once per test binary.
pub(crate) fn setup() {
    INSTALL.call_once(|| {
        Registry::builder()
            .driver(MemoryDriver)
            .install()
            .expect("install registry");
    });
}

/// A root directory on a volume no other test uses.
pub(crate) fn new_root() -> Dir {
    setup();
    let name = format!("test-volume-{}", VOLUME.fetch_add(1, Ordering::Relaxed));
    MemoryDirectory::mount(None, &name, 0).expect("mount volume")
}

pub(crate) fn volume_name() -> String {
    format!("test-mounted-{}", VOLUME.fetch_add(1, Ordering::Relaxed))
}
