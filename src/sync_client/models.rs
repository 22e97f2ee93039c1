use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::types::MonitorError;

use super::helpers::{bytes_to_mib, lenient_f64, lenient_u64};

/// Login for the web GUI, read from the credential file.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "BTSYNC_USR")]
    pub username: String,
    #[serde(rename = "BTSYNC_PSW")]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session token handed out by `token.html`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoCredentials,
    CredentialsLoaded,
    TokenAcquired,
}

/// Transfer rates and file counts from one status poll.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SyncMetrics {
    pub down_speed_mibps: f64,
    pub up_speed_mibps: f64,
    pub total_files: u64,
    pub files_pending_download: u64,
}

impl SyncMetrics {
    /// Builds metrics from a `getsyncfolders` response.
    ///
    /// Expected shape: `{speed: {downspeed, upspeed}, folders: [{files, peers?: [{downfiles?}]}]}`.
    /// Peers without `downfiles` are skipped; any other missing or
    /// non-numeric field fails the whole poll.
    pub fn from_value(value: &Value) -> Result<Self, MonitorError> {
        let speed = value.get("speed").ok_or_else(|| missing("speed"))?;
        let down = speed
            .get("downspeed")
            .and_then(lenient_f64)
            .ok_or_else(|| missing("speed.downspeed"))?;
        let up = speed
            .get("upspeed")
            .and_then(lenient_f64)
            .ok_or_else(|| missing("speed.upspeed"))?;

        let folders = value
            .get("folders")
            .and_then(Value::as_array)
            .ok_or_else(|| missing("folders"))?;

        let mut total_files: u64 = 0;
        let mut files_pending_download: u64 = 0;
        for folder in folders {
            let files = folder
                .get("files")
                .and_then(lenient_u64)
                .ok_or_else(|| missing("folders[].files"))?;
            total_files = total_files.saturating_add(files);

            let Some(peers) = folder.get("peers").and_then(Value::as_array) else {
                continue;
            };
            for peer in peers {
                let Some(downfiles) = peer.get("downfiles") else {
                    continue;
                };
                let downfiles =
                    lenient_u64(downfiles).ok_or_else(|| missing("folders[].peers[].downfiles"))?;
                files_pending_download = files_pending_download.saturating_add(downfiles);
            }
        }

        Ok(Self {
            down_speed_mibps: bytes_to_mib(down),
            up_speed_mibps: bytes_to_mib(up),
            total_files,
            files_pending_download,
        })
    }
}

fn missing(field: &str) -> MonitorError {
    MonitorError::MetricsRequestFailed(format!("missing or invalid field `{field}`"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn files_are_summed_across_folders_and_peers() {
        let value = json!({
            "speed": {"downspeed": 0, "upspeed": 0},
            "folders": [
                {"files": 3, "peers": [{"downfiles": 1}, {"downfiles": 2}]},
                {"files": 5}
            ]
        });
        let metrics = SyncMetrics::from_value(&value).unwrap();
        assert_eq!(metrics.total_files, 8);
        assert_eq!(metrics.files_pending_download, 3);
    }

    #[test]
    fn speeds_are_converted_to_mib() {
        let value = json!({
            "speed": {"downspeed": 1048576, "upspeed": 524288},
            "folders": []
        });
        let metrics = SyncMetrics::from_value(&value).unwrap();
        assert_eq!(metrics.down_speed_mibps, 1.0);
        assert_eq!(metrics.up_speed_mibps, 0.5);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let value = json!({
            "speed": {"downspeed": "2097152", "upspeed": "0"},
            "folders": [{"files": "7", "peers": [{"name": "laptop"}, {"downfiles": "4"}]}]
        });
        let metrics = SyncMetrics::from_value(&value).unwrap();
        assert_eq!(metrics.down_speed_mibps, 2.0);
        assert_eq!(metrics.total_files, 7);
        assert_eq!(metrics.files_pending_download, 4);
    }

    #[test]
    fn missing_speed_fails_the_poll() {
        let value = json!({"folders": []});
        let err = SyncMetrics::from_value(&value).unwrap_err();
        assert!(matches!(err, MonitorError::MetricsRequestFailed(_)));
    }

    #[test]
    fn folder_without_file_count_fails_the_poll() {
        let value = json!({
            "speed": {"downspeed": 0, "upspeed": 0},
            "folders": [{"peers": []}]
        });
        assert!(SyncMetrics::from_value(&value).is_err());
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let credentials = Credentials {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{credentials:?} {:?}", AuthToken::new("abc123"));
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("abc123"));
    }
}
