use std::net::{Ipv4Addr, SocketAddrV4};

use nix::ifaddrs::getifaddrs;
use tracing::warn;

use crate::types::MonitorError;

pub(super) fn ipv4_address(interface: &str) -> Result<Ipv4Addr, MonitorError> {
    let addresses = getifaddrs().map_err(|err| {
        warn!(error = %err, "getifaddrs failed");
        MonitorError::InterfaceNotFound(interface.to_string())
    })?;

    addresses
        .filter(|entry| entry.interface_name == interface)
        .find_map(|entry| {
            entry
                .address
                .as_ref()
                .and_then(|address| address.as_sockaddr_in())
                .map(|sin| *SocketAddrV4::from(*sin).ip())
        })
        .ok_or_else(|| MonitorError::InterfaceNotFound(interface.to_string()))
}
