// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::dir::Dir;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, independent of where it went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("no such file or directory")]
    NotFound,

    #[error("name already exists")]
    NameConflict,

    #[error("not a directory")]
    NotADirectory,

    #[error("not a file")]
    NotAFile,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("driver error: {0}")]
    Driver(String),

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("cannot {0} the root directory")]
    RootTarget(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("driver registry already installed")]
    AlreadyInstalled,
}

/// An error annotated with the resolution context it was raised in.
///
/// Each resolver level hands the error back with its own context added.
/// `directory`, `filename` and `remaining` are filled by the innermost level
/// that saw the error; `path` grows outward one component per level.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    directory: Option<Dir>,
    filename: Option<String>,
    path: Option<String>,
    remaining: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            directory: None,
            filename: None,
            path: None,
            remaining: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn name_conflict() -> Self {
        Self::new(ErrorKind::NameConflict)
    }

    pub fn not_a_directory() -> Self {
        Self::new(ErrorKind::NotADirectory)
    }

    pub fn not_a_file() -> Self {
        Self::new(ErrorKind::NotAFile)
    }

    pub fn permission_denied(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied(what.into()))
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials)
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Driver(message.into()))
    }

    pub fn unimplemented(operation: &'static str) -> Self {
        Self::new(ErrorKind::Unimplemented(operation))
    }

    pub fn unknown_driver(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownDriver(name.into()))
    }

    pub fn root_target(operation: &'static str) -> Self {
        Self::new(ErrorKind::RootTarget(operation))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    pub fn already_installed() -> Self {
        Self::new(ErrorKind::AlreadyInstalled)
    }

    /// Add one resolver level of context.
    ///
    /// Fields already set by an inner level are kept. The path is prefixed
    /// with `name` so the outermost caller sees the full traversed path.
    #[must_use]
    pub fn annotate(mut self, directory: &Dir, name: &str, remaining: &str) -> Self {
        if self.directory.is_none() {
            self.directory = Some(directory.clone());
        }
        if self.filename.is_none() {
            self.filename = Some(name.to_string());
        }
        if self.remaining.is_none() {
            self.remaining = Some(remaining.to_string());
        }
        self.path = Some(match self.path.take() {
            Some(inner) if !inner.is_empty() && !name.is_empty() => format!("{name}/{inner}"),
            Some(inner) if !inner.is_empty() => inner,
            _ => name.to_string(),
        });
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Directory in which the failure happened.
    pub fn directory(&self) -> Option<&Dir> {
        self.directory.as_ref()
    }

    /// Name that was being resolved when the failure happened.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Path traversed from the outermost caller to the failing name.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Part of the path that was never reached.
    pub fn remaining(&self) -> Option<&str> {
        self.remaining.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_invalid_credentials(&self) -> bool {
        self.kind == ErrorKind::InvalidCredentials
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => write!(f, ": {path}")?,
            _ => {}
        }
        match self.remaining.as_deref() {
            Some(rest) if !rest.is_empty() => write!(f, " (unresolved: {rest})"),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("directory", &self.directory)
            .field("filename", &self.filename)
            .field("path", &self.path)
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl std::error::Error for Error {}
