//! Fakes for exercising the display driver and refresh loop without hardware
//! or a running sync daemon.
//!
//! ```ignore
//! let bus = RecordingBus::new();
//! let lcd = Lcd::new(bus.clone(), bus.clone());
//! // ... drive the display ...
//! assert_eq!(bus.commands().last(), Some(&0x01));
//! ```

use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::path::Path;
use std::rc::Rc;

use async_trait::async_trait;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use crate::config::ProcessMatch;
use crate::display::ENABLE;
use crate::probe::{HostProbe, MountState, ProcessState};
use crate::sync_client::{AuthToken, Credentials, SessionPhase, SyncMetrics, SyncSource};
use crate::types::MonitorError;

// ============================================================================
// Bus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Write(u8),
    Delay(u64),
}

/// A byte as the controller latched it, rebuilt from two strobed nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Command(u8),
    Data(u8),
}

#[derive(Default)]
struct BusState {
    events: Vec<BusEvent>,
    addresses: Vec<u8>,
    fail: bool,
}

/// I2C bus and delay provider in one, logging writes and delays in order.
/// Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingBus {
    state: Rc<RefCell<BusState>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state.borrow().events.clone()
    }

    pub fn writes(&self) -> Vec<u8> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Write(byte) => Some(*byte),
                BusEvent::Delay(_) => None,
            })
            .collect()
    }

    /// Distinct device addresses written to.
    pub fn addresses(&self) -> Vec<u8> {
        self.state.borrow().addresses.clone()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        decode_transfers(&self.state.borrow().events)
    }

    pub fn commands(&self) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter_map(|transfer| match transfer {
                Transfer::Command(byte) => Some(byte),
                Transfer::Data(_) => None,
            })
            .collect()
    }

    /// Text sent to the panel, one string per address command.
    pub fn text_runs(&self) -> Vec<(u8, String)> {
        let mut runs: Vec<(u8, String)> = Vec::new();
        for transfer in self.transfers() {
            match transfer {
                Transfer::Command(address) if address & 0x80 != 0 => {
                    runs.push((address, String::new()))
                }
                Transfer::Command(_) => {}
                Transfer::Data(byte) => {
                    if let Some((_, text)) = runs.last_mut() {
                        text.push(byte as char);
                    }
                }
            }
        }
        runs
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }
}

impl ErrorType for RecordingBus {
    type Error = ErrorKind;
}

impl I2c for RecordingBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(ErrorKind::Bus);
        }
        if !state.addresses.contains(&address) {
            state.addresses.push(address);
        }
        for operation in operations.iter() {
            if let Operation::Write(bytes) = operation {
                state
                    .events
                    .extend(bytes.iter().map(|byte| BusEvent::Write(*byte)));
            }
        }
        Ok(())
    }
}

impl DelayNs for RecordingBus {
    fn delay_ns(&mut self, ns: u32) {
        self.state
            .borrow_mut()
            .events
            .push(BusEvent::Delay(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        self.state
            .borrow_mut()
            .events
            .push(BusEvent::Delay(u64::from(us) * 1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.state
            .borrow_mut()
            .events
            .push(BusEvent::Delay(u64::from(ms) * 1_000_000));
    }
}

/// Rebuild latched bytes from the nibble captured on each rising enable edge.
pub fn decode_transfers(events: &[BusEvent]) -> Vec<Transfer> {
    let mut transfers = Vec::new();
    let mut pending_high: Option<u8> = None;
    for event in events {
        let BusEvent::Write(byte) = *event else {
            continue;
        };
        if byte & ENABLE == 0 {
            continue;
        }
        match pending_high.take() {
            None => pending_high = Some(byte),
            Some(high) => {
                let value = (high & 0xF0) | ((byte & 0xF0) >> 4);
                transfers.push(if high & 0x01 == 0 {
                    Transfer::Command(value)
                } else {
                    Transfer::Data(value)
                });
            }
        }
    }
    transfers
}

// ============================================================================
// Host probe
// ============================================================================

#[derive(Debug, Clone)]
struct ProbeState {
    address: Option<Ipv4Addr>,
    mount: Option<MountState>,
    process: Option<ProcessState>,
    calls: u32,
}

/// Probe with scripted answers. `None` answers fail the check.
#[derive(Clone)]
pub struct FakeProbe {
    state: Rc<RefCell<ProbeState>>,
}

impl FakeProbe {
    pub fn healthy() -> Self {
        Self {
            state: Rc::new(RefCell::new(ProbeState {
                address: Some(Ipv4Addr::new(192, 168, 1, 20)),
                mount: Some(MountState::Mounted),
                process: Some(ProcessState::Running),
                calls: 0,
            })),
        }
    }

    pub fn set_address(&self, address: Option<Ipv4Addr>) {
        self.state.borrow_mut().address = address;
    }

    pub fn set_mount(&self, mount: Option<MountState>) {
        self.state.borrow_mut().mount = mount;
    }

    pub fn set_process(&self, process: Option<ProcessState>) {
        self.state.borrow_mut().process = process;
    }

    /// Number of address checks so far, i.e. full refreshes.
    pub fn address_checks(&self) -> u32 {
        self.state.borrow().calls
    }
}

#[async_trait(?Send)]
impl HostProbe for FakeProbe {
    async fn host_address(&self, interface: &str) -> Result<Ipv4Addr, MonitorError> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        state
            .address
            .ok_or_else(|| MonitorError::InterfaceNotFound(interface.to_string()))
    }

    async fn mount_state(&self, path: &Path) -> Result<MountState, MonitorError> {
        self.state
            .borrow()
            .mount
            .ok_or_else(|| MonitorError::MountCheckFailed(path.display().to_string()))
    }

    async fn process_running(
        &self,
        name: &str,
        _matching: ProcessMatch,
    ) -> Result<ProcessState, MonitorError> {
        self.state
            .borrow()
            .process
            .ok_or_else(|| MonitorError::ProcessCheckFailed(name.to_string()))
    }
}

// ============================================================================
// Sync source
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOutcome {
    Ok,
    Missing,
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    Ok,
    RequestFailed,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricsOutcome {
    Ok(SyncMetrics),
    Failed,
    /// 401 from the status endpoint: fails and drops the token.
    TokenRejected,
}

#[derive(Debug)]
struct SyncState {
    credentials: CredentialOutcome,
    token: TokenOutcome,
    metrics: MetricsOutcome,
    phase: SessionPhase,
    credential_loads: u32,
    token_requests: u32,
    metric_fetches: u32,
}

/// Sync source following the real client's session rules with scripted outcomes.
#[derive(Clone)]
pub struct FakeSync {
    state: Rc<RefCell<SyncState>>,
}

impl FakeSync {
    pub fn healthy(metrics: SyncMetrics) -> Self {
        Self {
            state: Rc::new(RefCell::new(SyncState {
                credentials: CredentialOutcome::Ok,
                token: TokenOutcome::Ok,
                metrics: MetricsOutcome::Ok(metrics),
                phase: SessionPhase::NoCredentials,
                credential_loads: 0,
                token_requests: 0,
                metric_fetches: 0,
            })),
        }
    }

    pub fn set_credentials(&self, outcome: CredentialOutcome) {
        self.state.borrow_mut().credentials = outcome;
    }

    pub fn set_token(&self, outcome: TokenOutcome) {
        self.state.borrow_mut().token = outcome;
    }

    pub fn set_metrics(&self, outcome: MetricsOutcome) {
        self.state.borrow_mut().metrics = outcome;
    }

    pub fn credential_loads(&self) -> u32 {
        self.state.borrow().credential_loads
    }

    pub fn token_requests(&self) -> u32 {
        self.state.borrow().token_requests
    }

    pub fn metric_fetches(&self) -> u32 {
        self.state.borrow().metric_fetches
    }
}

#[async_trait(?Send)]
impl SyncSource for FakeSync {
    async fn load_credentials(&mut self) -> Result<Credentials, MonitorError> {
        let mut state = self.state.borrow_mut();
        state.credential_loads += 1;
        state.phase = SessionPhase::NoCredentials;
        match state.credentials {
            CredentialOutcome::Ok => {
                state.phase = SessionPhase::CredentialsLoaded;
                Ok(Credentials {
                    username: "user".into(),
                    password: "secret".into(),
                })
            }
            CredentialOutcome::Missing => Err(MonitorError::CredentialFileMissing(
                "btsync_cred.json".into(),
            )),
            CredentialOutcome::Malformed => Err(MonitorError::CredentialParseError(
                "expected value".into(),
            )),
        }
    }

    async fn acquire_token(&mut self) -> Result<AuthToken, MonitorError> {
        let mut state = self.state.borrow_mut();
        state.token_requests += 1;
        if state.phase == SessionPhase::NoCredentials {
            return Err(MonitorError::TokenRequestFailed(
                "credentials not loaded".into(),
            ));
        }
        match state.token {
            TokenOutcome::Ok => {
                state.phase = SessionPhase::TokenAcquired;
                Ok(AuthToken::new("fake-token"))
            }
            TokenOutcome::RequestFailed => {
                state.phase = SessionPhase::CredentialsLoaded;
                Err(MonitorError::TokenRequestFailed("connection refused".into()))
            }
            TokenOutcome::NotFound => {
                state.phase = SessionPhase::CredentialsLoaded;
                Err(MonitorError::TokenNotFound)
            }
        }
    }

    async fn fetch_metrics(&mut self) -> Result<SyncMetrics, MonitorError> {
        let mut state = self.state.borrow_mut();
        state.metric_fetches += 1;
        if state.phase != SessionPhase::TokenAcquired {
            return Err(MonitorError::MetricsRequestFailed("no auth token".into()));
        }
        match state.metrics {
            MetricsOutcome::Ok(metrics) => Ok(metrics),
            MetricsOutcome::Failed => Err(MonitorError::MetricsRequestFailed(
                "operation timed out".into(),
            )),
            MetricsOutcome::TokenRejected => {
                state.phase = SessionPhase::CredentialsLoaded;
                Err(MonitorError::MetricsRequestFailed(
                    "token rejected (401 Unauthorized)".into(),
                ))
            }
        }
    }

    fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }
}
