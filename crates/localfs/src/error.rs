// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

// Error types for local store operations

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WFS error: {0}")]
    Wfs(#[from] wfs::Error),

    #[error("No entry with key {key}")]
    MissingKey { key: i64 },

    #[error("No entry named {name}")]
    MissingName { name: String },

    #[error("Corrupt entry {key}: {message}")]
    Corrupt { key: i64, message: String },
}

impl StoreError {
    pub fn corrupt(key: i64, message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            key,
            message: message.into(),
        }
    }
}

impl From<StoreError> for wfs::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Wfs(err) => err,
            StoreError::MissingKey { .. } | StoreError::MissingName { .. } => wfs::Error::not_found(),
            other => wfs::Error::driver(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
