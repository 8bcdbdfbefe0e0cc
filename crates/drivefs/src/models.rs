// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use wfs::Timestamp;

use crate::error::Result;

/// Folder marker type of the remote service.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file resource.
pub const FILE_FIELDS: &str = "id,name,mimeType,createdTime,modifiedTime,size,properties";

/// One file or folder as described by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    /// Bytes of content. The service sends this as a decimal string.
    #[serde(default, deserialize_with = "size_from_string")]
    pub size: Option<u64>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl FileResource {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    pub fn is_mount_point(&self) -> bool {
        self.mime_type == wfs::INODE_MIME
    }

    pub fn created(&self) -> Result<Timestamp> {
        parse_or_now(self.created_time.as_deref())
    }

    pub fn modified(&self) -> Result<Timestamp> {
        parse_or_now(self.modified_time.as_deref())
    }
}

fn parse_or_now(text: Option<&str>) -> Result<Timestamp> {
    match text {
        Some(text) => Ok(wfs::parse_time(text)?),
        None => Ok(wfs::now()),
    }
}

fn size_from_string<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }
    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileResource>,
    pub next_page_token: Option<String>,
}

/// Error body returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorReason {
    #[serde(default)]
    pub reason: String,
}

impl ApiError {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error)
    }

    pub fn is_rate_limit(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.reason == "rateLimitExceeded" || e.reason == "userRateLimitExceeded")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_arrives_as_string() {
        let json = r#"{"id":"1","name":"a.txt","mimeType":"text/plain","size":"42"}"#;
        let file: FileResource = serde_json::from_str(json).unwrap();
        assert_eq!(file.size, Some(42));
        assert!(file.properties.is_empty());
    }

    #[test]
    fn test_folder_has_no_size() {
        let json = format!(r#"{{"id":"2","name":"docs","mimeType":"{FOLDER_MIME}"}}"#);
        let file: FileResource = serde_json::from_str(&json).unwrap();
        assert_eq!(file.size, None);
        assert!(file.is_folder());
    }

    #[test]
    fn test_rate_limit_reasons() {
        let body = r#"{"error":{"message":"slow down","errors":[{"reason":"userRateLimitExceeded"}]}}"#;
        let err = ApiError::parse(body).unwrap();
        assert!(err.is_rate_limit());

        let body = r#"{"error":{"message":"no","errors":[{"reason":"insufficientPermissions"}]}}"#;
        let err = ApiError::parse(body).unwrap();
        assert!(!err.is_rate_limit());
        assert_eq!(err.message, "no");

        assert!(ApiError::parse("<html>").is_none());
    }
}
