use tokio::process::Command;

use crate::config::ProcessMatch;
use crate::types::MonitorError;

/// Raw `ps -A` output.
pub(super) async fn process_table() -> Result<String, MonitorError> {
    let output = Command::new("ps")
        .arg("-A")
        .output()
        .await
        .map_err(|err| MonitorError::ProcessCheckFailed(format!("failed to run ps: {err}")))?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(MonitorError::ProcessCheckFailed(if stderr.is_empty() {
        format!("`ps -A` failed with status {}", output.status)
    } else {
        format!("`ps -A` failed: {stderr}")
    }))
}

/// Whether `name` shows up in a `ps -A` listing.
///
/// [`ProcessMatch::Substring`] searches the whole listing, header included, so
/// `sync` matches `btsync` and `rsync` alike.
pub fn table_contains(table: &str, name: &str, matching: ProcessMatch) -> bool {
    match matching {
        ProcessMatch::Substring => table.contains(name),
        ProcessMatch::Exact => table
            .lines()
            .skip(1)
            .filter_map(command_column)
            .any(|command| command == name),
    }
}

// PID TTY TIME CMD, where CMD may itself contain spaces
fn command_column(row: &str) -> Option<String> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    Some(fields[3..].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
  PID TTY          TIME CMD
    1 ?        00:00:03 systemd
  412 ?        00:12:40 btsync-helper
  977 pts/0    00:00:00 Web Content
";

    #[test]
    fn substring_matches_partial_names() {
        assert!(table_contains(TABLE, "btsync", ProcessMatch::Substring));
        assert!(table_contains(TABLE, "system", ProcessMatch::Substring));
        assert!(!table_contains(TABLE, "rslsync", ProcessMatch::Substring));
    }

    #[test]
    fn exact_requires_whole_command() {
        assert!(!table_contains(TABLE, "btsync", ProcessMatch::Exact));
        assert!(table_contains(TABLE, "btsync-helper", ProcessMatch::Exact));
        assert!(table_contains(TABLE, "Web Content", ProcessMatch::Exact));
        assert!(!table_contains(TABLE, "CMD", ProcessMatch::Exact));
    }
}
