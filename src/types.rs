use std::path::PathBuf;

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("I2C bus write failed: {0}")]
    HardwareFault(ErrorKind),

    #[error("network interface `{0}` not found or has no IPv4 address")]
    InterfaceNotFound(String),

    #[error("mount check failed: {0}")]
    MountCheckFailed(String),

    #[error("process check failed: {0}")]
    ProcessCheckFailed(String),

    #[error("credential file not found: {}", .0.display())]
    CredentialFileMissing(PathBuf),

    #[error("failed to parse credential file: {0}")]
    CredentialParseError(String),

    #[error("token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("token not present in response")]
    TokenNotFound,

    #[error("metrics request failed: {0}")]
    MetricsRequestFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Short code that fits on a display line next to its label.
    pub fn display_code(&self) -> &'static str {
        match self {
            MonitorError::HardwareFault(_) => "Err: LCD",
            MonitorError::InterfaceNotFound(_) => "Err: NIC NF",
            MonitorError::MountCheckFailed(_) | MonitorError::ProcessCheckFailed(_) => "ER",
            MonitorError::CredentialFileMissing(_) => "Err: CF NF",
            MonitorError::CredentialParseError(_) => "Err: CF Parse",
            MonitorError::TokenRequestFailed(_) => "Err: Token",
            MonitorError::TokenNotFound => "Err: No Token",
            MonitorError::MetricsRequestFailed(_) => "Err: Get info",
            MonitorError::Config(_) => "Err: Config",
            MonitorError::Io(_) => "Err: IO",
        }
    }
}
