//! Turns check results into display text. The only place that knows what
//! each line looks like.

use std::net::Ipv4Addr;

use crate::probe::{MountState, ProcessState};
use crate::sync_client::SyncMetrics;
use crate::types::MonitorError;

pub const METRICS_ERROR: &str = "Err: Get info";
/// Line 3 placeholder until a metrics poll succeeds.
pub const FILES_UNKNOWN: &str = "F:- FD:-";

pub fn address_line(address: &Result<Ipv4Addr, MonitorError>) -> String {
    match address {
        Ok(address) => format!("IP: {address}"),
        Err(err) => format!("IP: {}", err.display_code()),
    }
}

/// `TCM: OK   BTSYNC: OK` style summary of the mount and service checks.
pub fn services_line(
    mount_label: &str,
    mount: &Result<MountState, MonitorError>,
    service_label: &str,
    service: &Result<ProcessState, MonitorError>,
) -> String {
    let mount = match mount {
        Ok(MountState::Mounted) => "OK",
        Ok(MountState::NotMounted) => "NO",
        Err(err) => err.display_code(),
    };
    let service = match service {
        Ok(ProcessState::Running) => "OK",
        Ok(ProcessState::NotRunning) => "NO",
        Err(err) => err.display_code(),
    };
    format!("{mount_label}: {mount}   {service_label}: {service}")
}

pub fn credentials_line(result: &Result<(), MonitorError>) -> String {
    match result {
        Ok(()) => "Cred: OK".to_string(),
        Err(err) => err.display_code().to_string(),
    }
}

/// `None` when no token request was made because credentials were missing.
pub fn token_line(result: Option<&Result<(), MonitorError>>) -> String {
    match result {
        Some(Ok(())) => "Token: OK".to_string(),
        Some(Err(err)) => err.display_code().to_string(),
        None => "Token: skipped".to_string(),
    }
}

pub fn files_line(metrics: &SyncMetrics) -> String {
    format!("F:{} FD:{}", metrics.total_files, metrics.files_pending_download)
}

pub fn speed_line(metrics: &SyncMetrics) -> String {
    format!(
        "D:{:.1}M/s U:{:.1}M/s",
        metrics.down_speed_mibps, metrics.up_speed_mibps
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn address_or_code() {
        assert_eq!(address_line(&Ok(Ipv4Addr::new(192, 168, 1, 20))), "IP: 192.168.1.20");
        let missing = Err(MonitorError::InterfaceNotFound("eth0".into()));
        assert_eq!(address_line(&missing), "IP: Err: NIC NF");
    }

    #[test]
    fn services_summary_fills_twenty_columns() {
        let line = services_line(
            "TCM",
            &Ok(MountState::Mounted),
            "BTSYNC",
            &Ok(ProcessState::Running),
        );
        assert_eq!(line, "TCM: OK   BTSYNC: OK");
        assert_eq!(line.len(), 20);

        let line = services_line(
            "TCM",
            &Err(MonitorError::MountCheckFailed("denied".into())),
            "BTSYNC",
            &Ok(ProcessState::NotRunning),
        );
        assert_eq!(line, "TCM: ER   BTSYNC: NO");
    }

    #[test]
    fn speed_has_one_decimal() {
        let metrics = SyncMetrics {
            down_speed_mibps: 1.0,
            up_speed_mibps: 0.04,
            ..SyncMetrics::default()
        };
        assert_eq!(speed_line(&metrics), "D:1.0M/s U:0.0M/s");
    }

    #[test]
    fn file_counts() {
        let metrics = SyncMetrics {
            total_files: 8,
            files_pending_download: 3,
            ..SyncMetrics::default()
        };
        assert_eq!(files_line(&metrics), "F:8 FD:3");
    }

    #[test]
    fn session_lines() {
        assert_eq!(credentials_line(&Ok(())), "Cred: OK");
        let missing = Err(MonitorError::CredentialFileMissing(PathBuf::from("/x")));
        assert_eq!(credentials_line(&missing), "Err: CF NF");
        assert_eq!(token_line(None), "Token: skipped");
        assert_eq!(
            token_line(Some(&Err(MonitorError::TokenNotFound))),
            "Err: No Token"
        );
    }
}
