use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::types::MonitorError;

use super::types::{
    default_full_refresh_interval, default_http_timeout_secs, default_lcd_width, MAX_LCD_WIDTH,
};
use super::{paths, Config};

impl Config {
    /// Load configuration from config.json
    /// Falls back to defaults if the file doesn't exist or can't be parsed
    pub async fn load() -> Self {
        let config_path = paths::get_config_path();
        Self::load_from(&config_path).await
    }

    /// Load configuration from an explicit path, with the same fallback rules as [`Config::load`].
    pub async fn load_from(path: &Path) -> Self {
        match Self::try_load(path).await {
            Ok(config) => {
                info!(
                    bus = %config.i2c_device_path(),
                    address = config.lcd_address,
                    api = %config.api_base_url,
                    "Loaded configuration"
                );
                config
            }
            Err(err) => {
                warn!(error = ?err, "Failed to load config.json, using defaults");
                Self::default()
            }
        }
    }

    async fn try_load(path: &Path) -> Result<Self, MonitorError> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .map_err(|err| MonitorError::Config(format!("Failed to read config file: {err}")))?;

        let mut config: Config = serde_json::from_str(&contents)
            .map_err(|err| MonitorError::Config(format!("Failed to parse config.json: {err}")))?;

        config.sanitize();
        Ok(config)
    }

    /// Replace values the hardware or scheduler cannot work with.
    fn sanitize(&mut self) {
        if self.lcd_width == 0 || self.lcd_width > MAX_LCD_WIDTH {
            warn!(width = self.lcd_width, "lcd_width out of range, using default");
            self.lcd_width = default_lcd_width();
        }
        if self.full_refresh_interval == 0 {
            warn!("full_refresh_interval must be at least 1, using default");
            self.full_refresh_interval = default_full_refresh_interval();
        }
        if self.http_timeout_secs == 0 {
            warn!("http_timeout_secs must be at least 1, using default");
            self.http_timeout_secs = default_http_timeout_secs();
        }
    }
}
