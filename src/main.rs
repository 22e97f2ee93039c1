use linux_embedded_hal::{Delay, I2cdev};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sync_lcd_status::{
    Backlight, Config, Lcd, LocalProbe, MonitorError, RefreshScheduler, SyncClient,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MonitorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().await;

    let bus_path = config.i2c_device_path();
    let i2c = I2cdev::new(&bus_path).map_err(|err| {
        error!(bus = %bus_path, error = %err, "Failed to open I2C bus");
        MonitorError::Config(format!("Failed to open {bus_path}: {err}"))
    })?;

    let display = Lcd::new(i2c, Delay)
        .with_address(config.lcd_address)
        .with_width(config.lcd_width)
        .with_backlight(Backlight::from(config.backlight));
    let sync = SyncClient::new(&config)?;
    let scheduler = RefreshScheduler::new(display, LocalProbe, sync, config);

    info!("Starting status display");
    scheduler.run_until(shutdown_signal()).await
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            warn!(error = %err, "Failed to install SIGTERM handler");
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "Failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT");
        }
        _ = async {
            match sigterm.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        } => info!("Received SIGTERM"),
    }
}
