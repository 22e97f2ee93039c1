use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the service check matches the configured name against `ps -A` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMatch {
    /// Name appears anywhere in the process table output. Also matches
    /// unrelated processes whose names contain it.
    #[default]
    Substring,
    /// Name equals the command column of some row.
    Exact,
}

/// Operator settings for the status display. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    #[serde(default = "default_lcd_address")]
    pub lcd_address: u8,

    #[serde(default = "default_lcd_width")]
    pub lcd_width: usize,

    #[serde(default = "default_true")]
    pub backlight: bool,

    #[serde(default = "default_network_interface")]
    pub network_interface: String,

    #[serde(default = "default_mount_path")]
    pub mount_path: PathBuf,

    #[serde(default = "default_mount_label")]
    pub mount_label: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_service_label")]
    pub service_label: String,

    #[serde(default)]
    pub service_match: ProcessMatch,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Skip TLS certificate verification for self-signed local endpoints.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_full_refresh_interval")]
    pub full_refresh_interval: u32,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            lcd_address: default_lcd_address(),
            lcd_width: default_lcd_width(),
            backlight: true,
            network_interface: default_network_interface(),
            mount_path: default_mount_path(),
            mount_label: default_mount_label(),
            service_name: default_service_name(),
            service_label: default_service_label(),
            service_match: ProcessMatch::default(),
            api_base_url: default_api_base_url(),
            credentials_path: default_credentials_path(),
            accept_invalid_certs: false,
            http_timeout_secs: default_http_timeout_secs(),
            full_refresh_interval: default_full_refresh_interval(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Config {
    pub fn i2c_device_path(&self) -> String {
        format!("/dev/i2c-{}", self.i2c_bus)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

pub(super) const MAX_LCD_WIDTH: usize = 20;

fn default_i2c_bus() -> u8 {
    1
}

fn default_lcd_address() -> u8 {
    0x27
}

pub(super) fn default_lcd_width() -> usize {
    MAX_LCD_WIDTH
}

fn default_true() -> bool {
    true
}

fn default_network_interface() -> String {
    "eth0".to_string()
}

fn default_mount_path() -> PathBuf {
    PathBuf::from("/mnt/tc_disk")
}

fn default_mount_label() -> String {
    "TCM".to_string()
}

fn default_service_name() -> String {
    "btsync".to_string()
}

fn default_service_label() -> String {
    "BTSYNC".to_string()
}

fn default_api_base_url() -> String {
    "https://localhost:8888/gui/".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("/mnt/tc_disk/btsync_cred.json")
}

pub(super) fn default_http_timeout_secs() -> u64 {
    8
}

pub(super) fn default_full_refresh_interval() -> u32 {
    16
}

fn default_poll_interval_secs() -> u64 {
    3
}
