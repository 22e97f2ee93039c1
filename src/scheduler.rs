//! The polling loop: decides what to refresh on each tick and keeps the four
//! display lines in sync with the latest results.

use std::future::Future;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::display::{Lcd, Line};
use crate::probe::HostProbe;
use crate::status;
use crate::sync_client::{SessionPhase, SyncSource};
use crate::types::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Host checks, credential reload and token reacquisition, then metrics.
    Full,
    /// Metrics only, with the current token.
    Light,
}

/// Tick counter deciding between full and light refreshes.
///
/// Ticks `0, n, 2n, ...` are full; everything else is light.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: u32,
    counter: u32,
}

impl Cadence {
    pub fn new(interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            counter: interval,
        }
    }

    pub fn next(&mut self) -> RefreshKind {
        let kind = if self.counter >= self.interval {
            self.counter = 0;
            RefreshKind::Full
        } else {
            RefreshKind::Light
        };
        self.counter += 1;
        kind
    }

    /// Make the next tick a full refresh regardless of the count.
    pub fn force_full(&mut self) {
        self.counter = self.interval;
    }
}

/// Credential and token codes shown instead of metrics until the next full refresh.
#[derive(Debug, Clone)]
struct SessionFailure {
    credentials: String,
    token: String,
}

pub struct RefreshScheduler<I, D, P, S>
where
    I: I2c,
    D: DelayNs,
    P: HostProbe,
    S: SyncSource,
{
    display: Lcd<I, D>,
    probe: P,
    sync: S,
    config: Config,
    cadence: Cadence,
    session_failure: Option<SessionFailure>,
    lines: [String; 4],
    dirty: [bool; 4],
    /// Line 3 holds file counts from a successful poll.
    files_shown: bool,
    display_ready: bool,
}

impl<I, D, P, S> RefreshScheduler<I, D, P, S>
where
    I: I2c,
    D: DelayNs,
    P: HostProbe,
    S: SyncSource,
{
    pub fn new(display: Lcd<I, D>, probe: P, sync: S, config: Config) -> Self {
        Self {
            display,
            probe,
            sync,
            cadence: Cadence::new(config.full_refresh_interval),
            config,
            session_failure: None,
            lines: Default::default(),
            dirty: [true; 4],
            files_shown: false,
            display_ready: false,
        }
    }

    /// Text currently shown (or pending) on lines 1 to 4.
    pub fn lines(&self) -> &[String; 4] {
        &self.lines
    }

    /// Poll until `shutdown` completes, then clear the display.
    ///
    /// Consumes the scheduler so the clear is sent exactly once. Bus writes
    /// never await, so shutdown cannot land in the middle of a character.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), MonitorError>
    where
        F: Future<Output = ()>,
    {
        if let Err(err) = self.ensure_display() {
            warn!(error = %err, "Display initialization failed, retrying on next tick");
        }

        tokio::select! {
            biased;
            _ = shutdown => info!("Shutdown requested"),
            _ = self.run_forever() => {}
        }

        self.display.clear().inspect_err(|err| {
            warn!(error = %err, "Failed to clear display on shutdown");
        })?;
        info!("Display cleared");
        Ok(())
    }

    async fn run_forever(&mut self) {
        let interval = self.config.poll_interval();
        loop {
            match self.tick().await {
                Ok(kind) => debug!(?kind, "Tick complete"),
                Err(err) => warn!(error = %err, "Tick aborted"),
            }
            sleep(interval).await;
        }
    }

    /// Run one refresh and push changed lines to the display.
    ///
    /// Only a bus failure makes this return an error; check failures end up
    /// as codes on the display.
    pub async fn tick(&mut self) -> Result<RefreshKind, MonitorError> {
        let kind = self.cadence.next();
        if kind == RefreshKind::Full {
            self.full_refresh().await;
        }

        match self.session_failure.clone() {
            Some(failure) => {
                self.set_line(Line::Three, failure.credentials);
                self.set_line(Line::Four, failure.token);
                self.files_shown = false;
            }
            None => self.light_refresh().await,
        }

        self.render()?;
        Ok(kind)
    }

    async fn full_refresh(&mut self) {
        let address = self
            .probe
            .host_address(&self.config.network_interface)
            .await;
        if let Err(err) = &address {
            warn!(interface = %self.config.network_interface, error = %err, "Address check failed");
        }

        let mount = self.probe.mount_state(&self.config.mount_path).await;
        if let Err(err) = &mount {
            warn!(path = %self.config.mount_path.display(), error = %err, "Mount check failed");
        }

        let service = self
            .probe
            .process_running(&self.config.service_name, self.config.service_match)
            .await;
        if let Err(err) = &service {
            warn!(service = %self.config.service_name, error = %err, "Service check failed");
        }

        self.set_line(Line::One, status::address_line(&address));
        self.set_line(
            Line::Two,
            status::services_line(
                &self.config.mount_label,
                &mount,
                &self.config.service_label,
                &service,
            ),
        );

        let credentials = self.sync.load_credentials().await.map(|_| ());
        let token = match &credentials {
            Ok(()) => Some(self.sync.acquire_token().await.map(|_| ())),
            Err(err) => {
                warn!(error = %err, "Credential reload failed");
                None
            }
        };
        if let Some(Err(err)) = &token {
            warn!(error = %err, "Token request failed");
        }

        self.session_failure = match (&credentials, &token) {
            (Ok(()), Some(Ok(()))) => None,
            _ => Some(SessionFailure {
                credentials: status::credentials_line(&credentials),
                token: status::token_line(token.as_ref()),
            }),
        };

        info!(
            address = ?address.ok(),
            mount = ?mount.ok(),
            service = ?service.ok(),
            session_ok = self.session_failure.is_none(),
            "Full refresh"
        );
    }

    async fn light_refresh(&mut self) {
        match self.sync.fetch_metrics().await {
            Ok(metrics) => {
                debug!(?metrics, "Fetched sync metrics");
                self.set_line(Line::Three, status::files_line(&metrics));
                self.set_line(Line::Four, status::speed_line(&metrics));
                self.files_shown = true;
            }
            Err(err) => {
                warn!(error = %err, "Metrics poll failed");
                if !self.files_shown {
                    self.set_line(Line::Three, status::FILES_UNKNOWN.to_string());
                }
                self.set_line(Line::Four, status::METRICS_ERROR.to_string());
                if self.sync.phase() != SessionPhase::TokenAcquired {
                    info!("Token lost, scheduling full refresh");
                    self.cadence.force_full();
                }
            }
        }
    }

    fn set_line(&mut self, line: Line, text: String) {
        let index = usize::from(line.number() - 1);
        if self.lines[index] != text {
            self.lines[index] = text;
            self.dirty[index] = true;
        }
    }

    fn ensure_display(&mut self) -> Result<(), MonitorError> {
        if !self.display_ready {
            self.display.initialize()?;
            self.display_ready = true;
            // initialize() clears the panel
            self.dirty = [true; 4];
        }
        Ok(())
    }

    fn render(&mut self) -> Result<(), MonitorError> {
        self.ensure_display()?;
        for (index, line) in Line::ALL.into_iter().enumerate() {
            if !self.dirty[index] {
                continue;
            }
            if let Err(err) = self.display.write_line(line, &self.lines[index]) {
                // the controller may have lost nibble sync
                self.display_ready = false;
                return Err(err);
            }
            self.dirty[index] = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_refresh_every_sixteenth_tick() {
        let mut cadence = Cadence::new(16);
        let full: Vec<u32> = (0..64)
            .filter(|_| cadence.next() == RefreshKind::Full)
            .collect();
        assert_eq!(full, vec![0, 16, 32, 48]);
    }

    #[test]
    fn forced_full_restarts_the_count() {
        let mut cadence = Cadence::new(4);
        assert_eq!(cadence.next(), RefreshKind::Full);
        assert_eq!(cadence.next(), RefreshKind::Light);
        cadence.force_full();
        assert_eq!(cadence.next(), RefreshKind::Full);
        for _ in 0..3 {
            assert_eq!(cadence.next(), RefreshKind::Light);
        }
        assert_eq!(cadence.next(), RefreshKind::Full);
    }

    #[test]
    fn zero_interval_means_every_tick() {
        let mut cadence = Cadence::new(0);
        assert!((0..5).all(|_| cadence.next() == RefreshKind::Full));
    }
}
