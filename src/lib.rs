//! Status display for a BitTorrent Sync node: host checks and sync metrics
//! rendered on a 20x4 HD44780 LCD behind an I2C expander.

pub mod config;
pub mod display;
pub mod probe;
pub mod scheduler;
pub mod status;
pub mod sync_client;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

pub use config::Config;
pub use display::{Backlight, Lcd, Line};
pub use probe::{HostProbe, LocalProbe};
pub use scheduler::{Cadence, RefreshKind, RefreshScheduler};
pub use sync_client::{SyncClient, SyncSource};
pub use types::MonitorError;
