// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use diagnostics::log_info;
use serde_json::Value;

use crate::common::Context;

/// Command line params are JSON when they parse as JSON, strings otherwise.
pub fn parse_param(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Mount `driver` at `path`. The token is appended for remote folders.
pub async fn mount_command(ctx: &Context, path: &str, driver: &str, params: &[String]) -> Result<()> {
    let root = ctx.open_root().await?;
    let (parent, name) = ctx.open_parent(&root, path).await?;
    let mut params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
    if driver == drivefs::DRIVER_NAME && params.len() == 1 {
        if let Some(token) = &ctx.token {
            params.push(Value::String(token.clone()));
        }
    }
    _ = parent.mount(name, driver, params).await?;
    log_info!("Mounted {driver} at {path}", driver: driver, path: path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("12"), json!(12));
        assert_eq!(parse_param("null"), Value::Null);
        assert_eq!(parse_param("\"quoted\""), json!("quoted"));
        assert_eq!(parse_param("/tmp/a.duckdb"), json!("/tmp/a.duckdb"));
        assert_eq!(parse_param("1AbC_folder"), json!("1AbC_folder"));
    }
}
