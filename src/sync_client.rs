//! Client for the sync daemon's web GUI API.
//!
//! The session moves through three phases:
//! `NoCredentials -> CredentialsLoaded -> TokenAcquired`. Metrics are only
//! fetched in `TokenAcquired`, and reloading credentials always starts over
//! from `NoCredentials` so a token never outlives the credentials it was
//! issued for.

mod api_types;
mod client;
mod helpers;
mod models;

use async_trait::async_trait;

use crate::types::MonitorError;

pub use client::SyncClient;
pub use helpers::{bytes_to_mib, extract_token, load_credentials, BYTES_PER_MIB};
pub use models::{AuthToken, Credentials, SessionPhase, SyncMetrics};

/// What the refresh loop needs from the sync daemon.
#[async_trait(?Send)]
pub trait SyncSource {
    /// Re-read the credential file, discarding any token.
    async fn load_credentials(&mut self) -> Result<Credentials, MonitorError>;

    /// Request a fresh token with the loaded credentials.
    async fn acquire_token(&mut self) -> Result<AuthToken, MonitorError>;

    async fn fetch_metrics(&mut self) -> Result<SyncMetrics, MonitorError>;

    fn phase(&self) -> SessionPhase;
}

#[async_trait(?Send)]
impl SyncSource for SyncClient {
    async fn load_credentials(&mut self) -> Result<Credentials, MonitorError> {
        SyncClient::load_credentials(self).await
    }

    async fn acquire_token(&mut self) -> Result<AuthToken, MonitorError> {
        SyncClient::acquire_token(self).await
    }

    async fn fetch_metrics(&mut self) -> Result<SyncMetrics, MonitorError> {
        SyncClient::fetch_metrics(self).await
    }

    fn phase(&self) -> SessionPhase {
        SyncClient::phase(self)
    }
}
