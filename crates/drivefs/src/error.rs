// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

// Error types for remote store operations

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WFS error: {0}")]
    Wfs(#[from] wfs::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Upload session response has no Location header")]
    MissingSession,

    #[error("Upload gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: usize, reason: String },

    #[error("Upload session expired {restarts} times")]
    RestartsExhausted { restarts: usize },

    #[error("\"{name}\" is not a folder")]
    NotAFolder { name: String },

    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<DriveError> for wfs::Error {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::InvalidCredentials => wfs::Error::invalid_credentials(),
            DriveError::Wfs(err) => err,
            DriveError::NotAFolder { .. } => wfs::Error::not_a_directory(),
            DriveError::Api { status: 404, .. } => wfs::Error::not_found(),
            other => wfs::Error::driver(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
