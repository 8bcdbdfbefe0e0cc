// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use bytes::Bytes;
use diagnostics::log_debug;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Response, StatusCode};
use serde_json::json;

use crate::config::{BearerToken, DriveConfig};
use crate::error::{DriveError, Result};
use crate::models::{ApiError, FILE_FIELDS, FOLDER_MIME, FileList, FileResource};
use crate::upload::{Upload, UploadTarget};

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,createdTime,modifiedTime,size,properties)";

/// Content returned by a download.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub data: Bytes,
    /// The service honored the requested range.
    pub partial: bool,
}

/// Async client for the document storage REST API
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    config: Arc<DriveConfig>,
}

impl DriveClient {
    pub fn new(config: DriveConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.config.api_url.trim_end_matches('/'))
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/{id}", self.files_url())
    }

    /// Fetch the metadata of one file or folder
    pub async fn metadata(&self, token: &BearerToken, id: &str) -> Result<FileResource> {
        log_debug!("Fetching metadata of {id}", id: id);
        let response = self
            .http
            .get(self.file_url(id))
            .query(&[("fields", FILE_FIELDS)])
            .bearer_auth(token.secret())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// List every non-trashed child of a folder, following pagination
    pub async fn list_children(&self, token: &BearerToken, folder_id: &str) -> Result<Vec<FileResource>> {
        let query = format!("'{folder_id}' in parents and trashed = false");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.files_url())
                .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)])
                .bearer_auth(token.secret());
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }
            let page: FileList = check(request.send().await?).await?.json().await?;
            log_debug!("Listed {count} children of {folder_id}", count: page.files.len(), folder_id: folder_id);
            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(files)
    }

    /// Download content, optionally only bytes `[start, end)`
    pub async fn download(&self, token: &BearerToken, id: &str, range: Option<(u64, u64)>) -> Result<Download> {
        let mut request = self
            .http
            .get(self.file_url(id))
            .query(&[("alt", "media")])
            .bearer_auth(token.secret());
        if let Some((start, end)) = range {
            request = request.header(RANGE, format!("bytes={start}-{}", end.saturating_sub(1)));
        }
        let response = check(request.send().await?).await?;
        let partial = response.status() == StatusCode::PARTIAL_CONTENT;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await?;
        log_debug!("Downloaded {size} bytes of {id}", size: data.len(), id: id);
        Ok(Download {
            content_type,
            data,
            partial,
        })
    }

    pub async fn create_folder(&self, token: &BearerToken, parent: &str, name: &str) -> Result<FileResource> {
        log_debug!("Creating folder {name} in {parent}", name: name, parent: parent);
        let response = self
            .http
            .post(self.files_url())
            .query(&[("fields", FILE_FIELDS)])
            .bearer_auth(token.secret())
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent],
            }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn delete(&self, token: &BearerToken, id: &str) -> Result<()> {
        log_debug!("Deleting {id}", id: id);
        let response = self
            .http
            .delete(self.file_url(id))
            .bearer_auth(token.secret())
            .send()
            .await?;
        _ = check(response).await?;
        Ok(())
    }

    /// Upload content through a resumable session
    pub async fn upload(
        &self,
        token: &BearerToken,
        target: &UploadTarget,
        mime_type: &str,
        content: Bytes,
    ) -> Result<FileResource> {
        Upload::new(self, token, target, mime_type, content).run().await
    }
}

/// Pass successful responses through and turn the rest into errors.
pub(crate) async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(DriveError::InvalidCredentials);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

/// The service's own message when the body carries one.
pub(crate) fn api_error(status: u16, body: &str) -> DriveError {
    let message = ApiError::parse(body)
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let reason = StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown error");
            format!("HTTP {status} {reason}")
        });
    DriveError::Api { status, message }
}
