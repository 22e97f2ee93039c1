use std::path::PathBuf;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::types::MonitorError;

use super::api_types::{SyncFoldersQuery, TOKEN_PATH};
use super::helpers::{extract_token, load_credentials};
use super::models::{AuthToken, Credentials, SessionPhase, SyncMetrics};

enum Session {
    NoCredentials,
    CredentialsLoaded(Credentials),
    TokenAcquired {
        credentials: Credentials,
        token: AuthToken,
    },
}

impl Session {
    fn credentials(&self) -> Option<&Credentials> {
        match self {
            Session::NoCredentials => None,
            Session::CredentialsLoaded(credentials) => Some(credentials),
            Session::TokenAcquired { credentials, .. } => Some(credentials),
        }
    }
}

/// Owns the HTTP session, credentials and token for the sync daemon's GUI API.
pub struct SyncClient {
    http: Client,
    base_url: String,
    credentials_path: PathBuf,
    session: Session,
}

impl SyncClient {
    /// Prepare an HTTP client for the configured GUI endpoint. No request is made yet.
    pub fn new(config: &Config) -> Result<Self, MonitorError> {
        if config.accept_invalid_certs {
            warn!(
                url = %config.api_base_url,
                "TLS certificate verification is disabled for the sync API"
            );
        }

        // The token is bound to the GUI session cookie, so cookies must persist.
        let http = Client::builder()
            .timeout(config.http_timeout())
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|err| MonitorError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            credentials_path: config.credentials_path.clone(),
            session: Session::NoCredentials,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        match self.session {
            Session::NoCredentials => SessionPhase::NoCredentials,
            Session::CredentialsLoaded(_) => SessionPhase::CredentialsLoaded,
            Session::TokenAcquired { .. } => SessionPhase::TokenAcquired,
        }
    }

    /// Re-read the credential file. Any current token is dropped first, even
    /// if the read fails.
    pub async fn load_credentials(&mut self) -> Result<Credentials, MonitorError> {
        self.session = Session::NoCredentials;
        let credentials = load_credentials(&self.credentials_path).await?;
        debug!(path = %self.credentials_path.display(), "Loaded sync credentials");
        self.session = Session::CredentialsLoaded(credentials.clone());
        Ok(credentials)
    }

    /// Fetch `token.html` and keep the token it carries.
    pub async fn acquire_token(&mut self) -> Result<AuthToken, MonitorError> {
        let credentials = self.session.credentials().cloned().ok_or_else(|| {
            MonitorError::TokenRequestFailed("credentials not loaded".to_string())
        })?;

        let result = self.request_token(&credentials).await;
        self.session = match &result {
            Ok(token) => {
                info!("Acquired sync API token");
                Session::TokenAcquired {
                    credentials,
                    token: token.clone(),
                }
            }
            Err(_) => Session::CredentialsLoaded(credentials),
        };
        result
    }

    /// Poll folder status with the current token.
    ///
    /// Every failure comes back as [`MonitorError::MetricsRequestFailed`]. A
    /// 401/403 also drops the token, moving the session back to
    /// [`SessionPhase::CredentialsLoaded`].
    pub async fn fetch_metrics(&mut self) -> Result<SyncMetrics, MonitorError> {
        let (credentials, token) = match &self.session {
            Session::TokenAcquired { credentials, token } => (credentials.clone(), token.clone()),
            _ => {
                return Err(MonitorError::MetricsRequestFailed(
                    "no auth token".to_string(),
                ))
            }
        };

        let query = SyncFoldersQuery::new(token.as_str(), Utc::now().timestamp());
        let response = self
            .http
            .get(self.endpoint(""))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .query(&query)
            .send()
            .await
            .map_err(metrics_failed)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Sync API rejected token, dropping it");
            self.session = Session::CredentialsLoaded(credentials);
            return Err(MonitorError::MetricsRequestFailed(format!(
                "token rejected ({status})"
            )));
        }
        if !status.is_success() {
            return Err(MonitorError::MetricsRequestFailed(format!(
                "status endpoint returned {status}"
            )));
        }

        let value: Value = response.json().await.map_err(metrics_failed)?;
        SyncMetrics::from_value(&value)
    }

    async fn request_token(&self, credentials: &Credentials) -> Result<AuthToken, MonitorError> {
        let response = self
            .http
            .get(self.endpoint(TOKEN_PATH))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(token_failed)?;

        // A login rejection still serves a page; it just has no token in it.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Sync API rejected credentials");
        } else if let Err(err) = response.error_for_status_ref() {
            return Err(token_failed(err));
        }

        let body = response.text().await.map_err(token_failed)?;
        extract_token(&body)
            .map(AuthToken::new)
            .ok_or(MonitorError::TokenNotFound)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn token_failed(err: reqwest::Error) -> MonitorError {
    MonitorError::TokenRequestFailed(err.to_string())
}

fn metrics_failed(err: reqwest::Error) -> MonitorError {
    MonitorError::MetricsRequestFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Minimal HTTP/1.1 responder: one canned response per request path.
    async fn serve(routes: Vec<(&'static str, u16, String)>) -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::clone(&log);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|window| window == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let target = head.split_whitespace().nth(1).unwrap_or("").to_string();
                requests.lock().unwrap().push(head);

                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _, _)| target.starts_with(prefix))
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, String::new()));
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{address}/gui/"), log)
    }

    fn credential_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"BTSYNC_USR":"a","BTSYNC_PSW":"b"}}"#).unwrap();
        file
    }

    fn client_for(base_url: &str, credentials: &NamedTempFile) -> SyncClient {
        let config = Config {
            api_base_url: base_url.to_string(),
            credentials_path: credentials.path().to_path_buf(),
            http_timeout_secs: 2,
            ..Config::default()
        };
        SyncClient::new(&config).unwrap()
    }

    const STATUS_BODY: &str = r#"{
        "speed": {"downspeed": 1048576, "upspeed": 0},
        "folders": [
            {"files": 3, "peers": [{"downfiles": 1}, {"downfiles": 2}]},
            {"files": 5}
        ]
    }"#;

    #[tokio::test]
    async fn token_then_metrics() {
        let (base_url, log) = serve(vec![
            ("/gui/token.html", 200, "<html><div id='token'>tok42</div></html>".to_string()),
            ("/gui/?", 200, STATUS_BODY.to_string()),
        ])
        .await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        let token = client.acquire_token().await.unwrap();
        assert_eq!(token.as_str(), "tok42");
        assert_eq!(client.phase(), SessionPhase::TokenAcquired);

        let metrics = client.fetch_metrics().await.unwrap();
        assert_eq!(metrics.total_files, 8);
        assert_eq!(metrics.files_pending_download, 3);
        assert_eq!(metrics.down_speed_mibps, 1.0);

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].contains("token=tok42"));
        assert!(requests[1].contains("action=getsyncfolders"));
        assert!(requests[1].contains("&t="));
        for request in requests.iter() {
            // base64("a:b")
            assert!(request.to_ascii_lowercase().contains("authorization: basic ytpi"));
        }
    }

    #[tokio::test]
    async fn token_page_without_token() {
        let (base_url, _log) =
            serve(vec![("/gui/token.html", 200, "<html>nothing</html>".to_string())]).await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, MonitorError::TokenNotFound));
        assert_eq!(client.phase(), SessionPhase::CredentialsLoaded);
    }

    #[tokio::test]
    async fn token_endpoint_error_status() {
        let (base_url, _log) = serve(vec![("/gui/token.html", 500, String::new())]).await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, MonitorError::TokenRequestFailed(_)));
    }

    #[tokio::test]
    async fn rejected_login_means_no_token() {
        let (base_url, _log) = serve(vec![(
            "/gui/token.html",
            401,
            "<html><body>Unauthorized</body></html>".to_string(),
        )])
        .await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, MonitorError::TokenNotFound));
        assert_eq!(err.display_code(), "Err: No Token");
        assert_eq!(client.phase(), SessionPhase::CredentialsLoaded);
    }

    #[tokio::test]
    async fn unreachable_api_fails_token_request() {
        let credentials = credential_file();
        let mut client = client_for("http://127.0.0.1:1/gui/", &credentials);

        client.load_credentials().await.unwrap();
        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, MonitorError::TokenRequestFailed(_)));
        assert_eq!(client.phase(), SessionPhase::CredentialsLoaded);
    }

    #[tokio::test]
    async fn rejected_token_is_dropped() {
        let (base_url, _log) = serve(vec![
            ("/gui/token.html", 200, "<div id=\"token\">old</div>".to_string()),
            ("/gui/?", 401, String::new()),
        ])
        .await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        client.acquire_token().await.unwrap();
        let err = client.fetch_metrics().await.unwrap_err();
        assert!(matches!(err, MonitorError::MetricsRequestFailed(_)));
        assert_eq!(client.phase(), SessionPhase::CredentialsLoaded);
    }

    #[tokio::test]
    async fn garbage_status_body_is_a_metrics_failure() {
        let (base_url, _log) = serve(vec![
            ("/gui/token.html", 200, "<div id=\"token\">t</div>".to_string()),
            ("/gui/?", 200, "<html>oops</html>".to_string()),
        ])
        .await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        client.acquire_token().await.unwrap();
        let err = client.fetch_metrics().await.unwrap_err();
        assert!(matches!(err, MonitorError::MetricsRequestFailed(_)));
        assert_eq!(client.phase(), SessionPhase::TokenAcquired);
    }

    #[tokio::test]
    async fn metrics_without_token_skip_the_network() {
        let credentials = credential_file();
        let mut client = client_for("http://127.0.0.1:1/gui/", &credentials);
        let err = client.fetch_metrics().await.unwrap_err();
        assert!(matches!(err, MonitorError::MetricsRequestFailed(_)));
    }

    #[tokio::test]
    async fn reloading_credentials_discards_token() {
        let (base_url, _log) = serve(vec![(
            "/gui/token.html",
            200,
            "<div id=\"token\">t</div>".to_string(),
        )])
        .await;
        let credentials = credential_file();
        let mut client = client_for(&base_url, &credentials);

        client.load_credentials().await.unwrap();
        client.acquire_token().await.unwrap();
        client.load_credentials().await.unwrap();
        assert_eq!(client.phase(), SessionPhase::CredentialsLoaded);
    }

    #[tokio::test]
    async fn failed_reload_leaves_no_credentials() {
        let credentials = credential_file();
        let mut client = client_for("http://127.0.0.1:1/gui/", &credentials);
        client.load_credentials().await.unwrap();

        let path = credentials.path().to_path_buf();
        drop(credentials);
        let err = client.load_credentials().await.unwrap_err();
        assert!(matches!(err, MonitorError::CredentialFileMissing(p) if p == path));
        assert_eq!(client.phase(), SessionPhase::NoCredentials);
    }

    #[tokio::test]
    async fn token_request_needs_credentials() {
        let credentials = credential_file();
        let mut client = client_for("http://127.0.0.1:1/gui/", &credentials);
        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, MonitorError::TokenRequestFailed(_)));
    }
}
