//! Read-only checks against the local host. Each check runs on its own so a
//! failing one never hides the result of the others.

mod mount;
mod network;
mod process;

use std::net::Ipv4Addr;
use std::path::Path;

use async_trait::async_trait;

use crate::config::ProcessMatch;
use crate::types::MonitorError;

pub use process::table_contains;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Mounted,
    NotMounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    NotRunning,
}

#[async_trait(?Send)]
pub trait HostProbe {
    /// IPv4 address bound to `interface`.
    async fn host_address(&self, interface: &str) -> Result<Ipv4Addr, MonitorError>;

    async fn mount_state(&self, path: &Path) -> Result<MountState, MonitorError>;

    async fn process_running(
        &self,
        name: &str,
        matching: ProcessMatch,
    ) -> Result<ProcessState, MonitorError>;
}

/// Probe backed by the running Linux host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProbe;

#[async_trait(?Send)]
impl HostProbe for LocalProbe {
    async fn host_address(&self, interface: &str) -> Result<Ipv4Addr, MonitorError> {
        network::ipv4_address(interface)
    }

    async fn mount_state(&self, path: &Path) -> Result<MountState, MonitorError> {
        mount::mount_state(path).await
    }

    async fn process_running(
        &self,
        name: &str,
        matching: ProcessMatch,
    ) -> Result<ProcessState, MonitorError> {
        let table = process::process_table().await?;
        Ok(if table_contains(&table, name, matching) {
            ProcessState::Running
        } else {
            ProcessState::NotRunning
        })
    }
}
