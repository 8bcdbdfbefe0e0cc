// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

/// First significant component of a path and everything after it.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Split<'a> {
    pub name: Option<&'a str>,
    pub rest: String,
}

pub(crate) fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Drop empty and `.` components, then split off the first one.
pub(crate) fn split(path: &str) -> Split<'_> {
    let mut parts = path.split('/').filter(|c| !c.is_empty() && *c != ".");
    let name = parts.next();
    let rest = parts.collect::<Vec<_>>().join("/");
    Split { name, rest }
}
