use std::io::ErrorKind;
use std::path::Path;

use scraper::{Html, Selector};
use serde_json::Value;
use tokio::fs;

use crate::types::MonitorError;

use super::models::Credentials;

pub const BYTES_PER_MIB: f64 = 1_048_576.0;

pub fn bytes_to_mib(bytes_per_sec: f64) -> f64 {
    bytes_per_sec / BYTES_PER_MIB
}

/// Read `{"BTSYNC_USR": ..., "BTSYNC_PSW": ...}` from `path`.
pub async fn load_credentials(path: &Path) -> Result<Credentials, MonitorError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(MonitorError::CredentialFileMissing(path.to_path_buf()))
        }
        Err(err) => return Err(MonitorError::Io(err)),
    };
    serde_json::from_str(&contents)
        .map_err(|err| MonitorError::CredentialParseError(err.to_string()))
}

/// Text of the `<div id="token">` element in the token page.
pub fn extract_token(html: &str) -> Option<String> {
    let selector = Selector::parse("div#token").ok()?;
    let document = Html::parse_document(html);
    let token: String = document.select(&selector).next()?.text().collect();
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub(super) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(super) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
