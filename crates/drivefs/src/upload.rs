// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Resumable chunked upload.
//!
//! An upload negotiates a session URL, then sends the content in chunks of
//! `chunk_size` bytes. The service acknowledges each chunk with a 308 and a
//! `Range` header naming the bytes it holds, or with 200/201 and the file
//! resource once everything arrived. Transient failures are retried with
//! exponential backoff; a forgotten session (404) starts over with a fresh
//! negotiation.

use std::collections::BTreeMap;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use bytes::Bytes;
use diagnostics::{log_debug, log_warn};
use reqwest::header::{CONTENT_RANGE, LOCATION};
use serde_json::{Map, Value, json};
use wfs::Timestamp;

use crate::client::{DriveClient, api_error, check};
use crate::config::{BearerToken, DriveConfig};
use crate::error::{DriveError, Result};
use crate::models::{ApiError, FILE_FIELDS, FileResource};

/// Where uploaded content goes.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadTarget {
    /// A new file in folder `parent`.
    Create {
        parent: String,
        name: String,
        properties: BTreeMap<String, String>,
        created: Option<Timestamp>,
        modified: Option<Timestamp>,
    },
    /// Replace the content of an existing file.
    Update { id: String },
}

impl UploadTarget {
    pub fn create(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Create {
            parent: parent.into(),
            name: name.into(),
            properties: BTreeMap::new(),
            created: None,
            modified: None,
        }
    }

    fn metadata(&self, mime_type: &str) -> Value {
        let mut body = Map::new();
        _ = body.insert("mimeType".to_string(), json!(mime_type));
        if let Self::Create {
            parent,
            name,
            properties,
            created,
            modified,
        } = self
        {
            _ = body.insert("name".to_string(), json!(name));
            _ = body.insert("parents".to_string(), json!([parent]));
            if !properties.is_empty() {
                _ = body.insert("properties".to_string(), json!(properties));
            }
            if let Some(created) = created {
                _ = body.insert("createdTime".to_string(), json!(wfs::format_time(created)));
            }
            if let Some(modified) = modified {
                _ = body.insert("modifiedTime".to_string(), json!(wfs::format_time(modified)));
            }
        }
        Value::Object(body)
    }
}

/// What to do after the service answered one chunk.
#[derive(Debug)]
pub(crate) enum ChunkOutcome {
    Complete,
    /// Continue from this byte offset.
    Advance(u64),
    Retry(String),
    /// The session is gone; negotiate a new one.
    Restart,
    Fail(DriveError),
}

/// Decide how to continue from the status, `Range` header and body of a chunk response.
pub(crate) fn classify_chunk_response(status: u16, range: Option<&str>, body: &str) -> ChunkOutcome {
    match status {
        200 | 201 => ChunkOutcome::Complete,
        308 => ChunkOutcome::Advance(range.and_then(acknowledged_end).unwrap_or(0)),
        401 => ChunkOutcome::Fail(DriveError::InvalidCredentials),
        403 => match ApiError::parse(body) {
            Some(err) if err.is_rate_limit() => ChunkOutcome::Retry(format!("rate limited: {}", err.message)),
            _ => ChunkOutcome::Fail(api_error(status, body)),
        },
        404 | 410 => ChunkOutcome::Restart,
        429 => ChunkOutcome::Retry("too many requests".to_string()),
        500..=599 => ChunkOutcome::Retry(format!("server error {status}")),
        _ => ChunkOutcome::Fail(api_error(status, body)),
    }
}

/// Offset following the last acknowledged byte of `bytes=0-N`.
pub(crate) fn acknowledged_end(header: &str) -> Option<u64> {
    let (_, last) = header.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<u64>().ok()?.checked_add(1)
}

/// `Content-Range` of a chunk covering `[start, end)` of `total` bytes.
pub(crate) fn content_range(start: u64, end: u64, total: u64) -> String {
    if start >= end {
        format!("bytes */{total}")
    } else {
        format!("bytes {start}-{}/{total}", end - 1)
    }
}

enum UploadState {
    Negotiate,
    SendChunk { session: String, offset: u64 },
    Backoff { session: String, offset: u64, delay: Duration },
    Done(FileResource),
}

/// One upload in progress.
pub(crate) struct Upload<'a> {
    client: &'a DriveClient,
    token: &'a BearerToken,
    target: &'a UploadTarget,
    mime_type: &'a str,
    content: Bytes,
    backoff: ExponentialBackoff,
    attempts: usize,
    restarts: usize,
}

fn new_backoff(config: &DriveConfig) -> ExponentialBackoff {
    ExponentialBuilder::default()
        .with_min_delay(config.backoff_min())
        .with_max_delay(config.backoff_max())
        .with_factor(2.0)
        .with_max_times(config.max_retries)
        .build()
}

impl<'a> Upload<'a> {
    pub(crate) fn new(
        client: &'a DriveClient,
        token: &'a BearerToken,
        target: &'a UploadTarget,
        mime_type: &'a str,
        content: Bytes,
    ) -> Self {
        Self {
            client,
            token,
            target,
            mime_type,
            content,
            backoff: new_backoff(client.config()),
            attempts: 0,
            restarts: 0,
        }
    }

    fn total(&self) -> u64 {
        self.content.len() as u64
    }

    pub(crate) async fn run(mut self) -> Result<FileResource> {
        let mut state = UploadState::Negotiate;
        loop {
            state = match state {
                UploadState::Negotiate => UploadState::SendChunk {
                    session: self.negotiate().await?,
                    offset: 0,
                },
                UploadState::SendChunk { session, offset } => self.send_chunk(session, offset).await?,
                UploadState::Backoff {
                    session,
                    offset,
                    delay,
                } => {
                    tokio::time::sleep(delay).await;
                    UploadState::SendChunk { session, offset }
                }
                UploadState::Done(file) => return Ok(file),
            };
        }
    }

    async fn negotiate(&self) -> Result<String> {
        let base = self.client.config().upload_url.trim_end_matches('/');
        let http = self.client.http();
        let request = match self.target {
            UploadTarget::Create { .. } => http.post(format!("{base}/files")),
            UploadTarget::Update { id } => http.patch(format!("{base}/files/{id}")),
        };
        let response = request
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .bearer_auth(self.token.secret())
            .header("X-Upload-Content-Type", self.mime_type)
            .header("X-Upload-Content-Length", self.total())
            .json(&self.target.metadata(self.mime_type))
            .send()
            .await?;
        let response = check(response).await?;
        let session = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(DriveError::MissingSession)?;
        log_debug!("Negotiated upload session for {total} bytes", total: self.total());
        Ok(session)
    }

    async fn send_chunk(&mut self, session: String, offset: u64) -> Result<UploadState> {
        let total = self.total();
        let chunk_size = self.client.config().chunk_size as u64;
        let end = offset.saturating_add(chunk_size).min(total);
        let range = content_range(offset, end, total);
        let chunk = if offset < end {
            self.content.slice(offset as usize..end as usize)
        } else {
            Bytes::new()
        };

        let sent = self
            .client
            .http()
            .put(&session)
            .bearer_auth(self.token.secret())
            .header(CONTENT_RANGE, &range)
            .body(chunk)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(err) if err.is_timeout() || err.is_connect() => {
                return self.retry(session, offset, err.to_string());
            }
            Err(err) => return Err(err.into()),
        };

        let status = response.status().as_u16();
        let acked = response
            .headers()
            .get("range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        match classify_chunk_response(status, acked.as_deref(), &body) {
            ChunkOutcome::Complete => {
                log_debug!("Upload complete after {total} bytes", total: total);
                Ok(UploadState::Done(serde_json::from_str(&body)?))
            }
            ChunkOutcome::Advance(next) if next > offset => {
                self.reset_backoff();
                Ok(UploadState::SendChunk {
                    session,
                    offset: next.min(total),
                })
            }
            ChunkOutcome::Advance(next) => {
                let next = next.min(total);
                self.retry(session, next, format!("no progress past byte {next}"))
            }
            ChunkOutcome::Retry(reason) => self.retry(session, offset, reason),
            ChunkOutcome::Restart => {
                self.restarts += 1;
                if self.restarts > self.client.config().max_restarts {
                    return Err(DriveError::RestartsExhausted {
                        restarts: self.restarts - 1,
                    });
                }
                log_warn!("Upload session expired, restarting ({restarts})", restarts: self.restarts);
                self.reset_backoff();
                Ok(UploadState::Negotiate)
            }
            ChunkOutcome::Fail(err) => Err(err),
        }
    }

    fn retry(&mut self, session: String, offset: u64, reason: String) -> Result<UploadState> {
        self.attempts += 1;
        match self.backoff.next() {
            Some(delay) => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                log_warn!(
                    "Retrying upload at byte {offset} in {delay_ms} ms: {reason}",
                    offset: offset,
                    delay_ms: delay_ms,
                    reason: reason.as_str()
                );
                Ok(UploadState::Backoff {
                    session,
                    offset,
                    delay,
                })
            }
            None => Err(DriveError::RetriesExhausted {
                attempts: self.attempts,
                reason,
            }),
        }
    }

    fn reset_backoff(&mut self) {
        self.backoff = new_backoff(self.client.config());
        self.attempts = 0;
    }
}
