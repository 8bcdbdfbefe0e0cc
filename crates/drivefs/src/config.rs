// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DriveError, Result};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Connection and upload tuning for the remote driver.
///
/// Every field has a default, so a YAML file only lists what it changes:
///
/// ```yaml
/// chunk_size: 8388608
/// max_retries: 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveConfig {
    pub api_url: String,
    pub upload_url: String,
    /// Bytes per upload request. The service wants multiples of 256 KiB
    /// for every chunk but the last.
    pub chunk_size: usize,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    /// Retries of one chunk before the upload fails.
    pub max_retries: usize,
    /// Fresh upload sessions after the service forgets one.
    pub max_restarts: usize,
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            chunk_size: 16 * 1024 * 1024,
            backoff_min_ms: 1000,
            backoff_max_ms: 64_000,
            max_retries: 10,
            max_restarts: 5,
            timeout_secs: 60,
        }
    }
}

impl DriveConfig {
    pub fn backoff_min(&self) -> Duration {
        Duration::from_millis(self.backoff_min_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DriveError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.backoff_min_ms > self.backoff_max_ms {
            return Err(DriveError::Config(
                "backoff_min_ms cannot exceed backoff_max_ms".to_string(),
            ));
        }
        if self.api_url.is_empty() || self.upload_url.is_empty() {
            return Err(DriveError::Config("service URLs cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DriveConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: DriveConfig = serde_yaml_ng::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// OAuth access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}
