//! Shared fixtures for the provider integration tests

#![allow(dead_code)]

use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::time::FixedClock;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_auth::{AuthError, AuthenticatedTransport, CredentialProvider};
use core_runtime::config::{DriveConfig, OAuthClientConfig};
use provider_google_drive::{DriveClient, RetryingProxy, ServiceClientFactory};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DISCOVERY_URL: &str = "https://discovery.test/drive/v2/rest";
pub const API_BASE: &str = "https://drive.test/drive/v2/";

const DISCOVERY: &str = r#"{
    "kind": "discovery#restDescription",
    "name": "drive",
    "version": "v2",
    "rootUrl": "https://drive.test/",
    "servicePath": "drive/v2/"
}"#;

// ============================================================================
// Scripted HTTP
// ============================================================================

/// HTTP fake answering API requests from a queue, in order.
///
/// The discovery document is served separately and does not consume the
/// queue. Every request is recorded.
#[derive(Default)]
pub struct ScriptedHttp {
    script: Mutex<VecDeque<BridgeResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, outcome: BridgeResult<HttpResponse>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.push(Ok(response(status, body, &[])));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.push(Err(BridgeError::Transport(message.to_string())));
    }

    /// API requests seen so far, discovery excluded.
    pub fn api_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url != DISCOVERY_URL)
            .cloned()
            .collect()
    }

    pub fn api_calls(&self) -> usize {
        self.api_requests().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let is_discovery = request.url == DISCOVERY_URL;
        self.requests.lock().unwrap().push(request.clone());

        if is_discovery {
            return Ok(response(200, DISCOVERY, &[]));
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {:?} {}", request.method, request.url))
    }
}

pub fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        body: Bytes::from(body.to_string()),
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential provider with a fixed token that counts refreshes.
pub struct StubCredentials {
    http: Arc<dyn HttpClient>,
    refreshes: AtomicUsize,
    refresh_error: Mutex<Option<AuthError>>,
}

impl StubCredentials {
    pub fn new(http: Arc<dyn HttpClient>) -> Arc<Self> {
        Arc::new(Self {
            http,
            refreshes: AtomicUsize::new(0),
            refresh_error: Mutex::new(None),
        })
    }

    pub fn fail_next_refresh(&self, error: AuthError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CredentialProvider for StubCredentials {
    async fn transport(&self) -> core_auth::Result<AuthenticatedTransport> {
        Ok(AuthenticatedTransport::new(self.http.clone(), "test-token"))
    }

    async fn force_refresh(&self) -> core_auth::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match self.refresh_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn remote_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 29, 8, 30, 0).unwrap()
}

pub fn config(staging_dir: &Path, hidden_flags: &[&str], chunk_size: u64) -> DriveConfig {
    DriveConfig::builder()
        .discovery_url(DISCOVERY_URL)
        .staging_dir(staging_dir)
        .hidden_flags(hidden_flags.iter().copied())
        .download_chunk_size(chunk_size)
        .oauth(OAuthClientConfig::new("test-client"))
        .build()
        .unwrap()
}

pub struct Harness {
    pub http: Arc<ScriptedHttp>,
    pub credentials: Arc<StubCredentials>,
    pub drive: RetryingProxy<DriveClient>,
}

pub fn harness(config: DriveConfig) -> Harness {
    let http = ScriptedHttp::new();
    let credentials = StubCredentials::new(http.clone());
    let auto_refresh = config.auto_refresh;

    let factory = Arc::new(ServiceClientFactory::new(
        config.discovery_url.clone(),
        credentials.clone(),
    ));
    let client = DriveClient::new(
        factory,
        Arc::new(TokioFileSystem::new()),
        Arc::new(FixedClock(remote_time())),
        Arc::new(config),
    );

    Harness {
        drive: RetryingProxy::new(client, credentials.clone(), auto_refresh),
        http,
        credentials,
    }
}

/// JSON for one file resource.
pub fn file_json(id: &str, title: &str, labels: &[(&str, bool)]) -> String {
    let labels = labels
        .iter()
        .map(|(name, set)| format!(r#""{}":{}"#, name, set))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{"id":"{id}","title":"{title}","mimeType":"text/plain",
            "modifiedDate":"2024-02-29T08:30:00.000Z","labels":{{{labels}}},
            "downloadUrl":"https://media.test/{id}","parents":[{{"id":"root"}}]}}"#
    )
}
