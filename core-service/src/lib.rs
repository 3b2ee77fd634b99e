//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! secure storage, clock) into the Drive gateway. Desktop apps typically
//! enable the `desktop-shims` feature (which depends on `bridge-desktop`) and
//! build their dependencies with [`CoreDependencies::desktop`].
//!
//! [`CoreService`] is the one context object a host keeps: it owns the
//! credential manager and the service client factory, and hands out the
//! retrying [`RemoteStore`] every filesystem call goes through.
//!
//! ```ignore
//! use core_service::{CoreDependencies, CoreService, DriveConfig};
//! use provider_google_drive::RemoteStore;
//!
//! let core = CoreService::new(config, CoreDependencies::desktop()?)?;
//! let drive = core.drive().await?;
//! let about = drive.get_about().await?;
//! core.shutdown().await;
//! ```

pub mod error;

pub use core_runtime::config::DriveConfig;
pub use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    storage::{FileSystemAccess, SecureStore},
    time::{Clock, SystemClock},
};
use core_auth::{CredentialManager, CredentialProvider};
use provider_google_drive::{ChangeLogReader, DriveClient, RetryingProxy, ServiceClientFactory};
use tokio::sync::RwLock;
use tracing::{info, instrument};

pub use provider_google_drive::RemoteStore;

/// The proxied operation set handed to callers.
pub type Drive = RetryingProxy<DriveClient>;

/// Bridge implementations supplied by the host.
///
/// HTTP, filesystem and secure storage are required; the clock defaults to
/// the system clock.
#[derive(Default)]
pub struct CoreDependencies {
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub filesystem: Option<Arc<dyn FileSystemAccess>>,
    pub secure_store: Option<Arc<dyn SecureStore>>,
    pub clock: Option<Arc<dyn Clock>>,
}

impl CoreDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_filesystem(mut self, filesystem: Arc<dyn FileSystemAccess>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn with_secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Desktop defaults: reqwest, tokio::fs and the OS keychain.
    #[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
    pub fn desktop() -> Result<Self> {
        let http = bridge_desktop::ReqwestHttpClient::new()
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        Ok(Self::new()
            .with_http_client(Arc::new(http))
            .with_filesystem(Arc::new(bridge_desktop::TokioFileSystem::new()))
            .with_secure_store(Arc::new(bridge_desktop::KeyringSecureStore::new())))
    }
}

fn require<T: ?Sized>(value: Option<Arc<T>>, capability: &str, message: &str) -> Result<Arc<T>> {
    value.ok_or_else(|| CoreError::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    })
}

struct ServiceContext {
    credentials: Arc<CredentialManager>,
    factory: Arc<ServiceClientFactory>,
    drive: Arc<Drive>,
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    config: Arc<DriveConfig>,
    context: RwLock<Option<Arc<ServiceContext>>>,
}

impl CoreService {
    /// Validate `config`, check the host capabilities and wire the gateway.
    ///
    /// Nothing touches the network here; the discovery document and the
    /// credential are loaded on the first remote operation.
    pub fn new(config: DriveConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let http = require(
            deps.http_client,
            "HttpClient",
            "an HTTP client is required for every remote operation",
        )?;
        let filesystem = require(
            deps.filesystem,
            "FileSystemAccess",
            "a filesystem is required to stage downloads",
        )?;
        let secure_store = require(
            deps.secure_store,
            "SecureStore",
            "secure storage is required to load the persisted OAuth tokens",
        )?;
        let clock = deps.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let config = Arc::new(config);

        let credentials = Arc::new(CredentialManager::new(
            config.oauth.clone(),
            http,
            secure_store,
            clock.clone(),
        ));
        let provider: Arc<dyn CredentialProvider> = credentials.clone();

        let factory = Arc::new(ServiceClientFactory::new(
            config.discovery_url.clone(),
            provider.clone(),
        ));
        let client = DriveClient::new(factory.clone(), filesystem, clock, config.clone());
        let drive = Arc::new(RetryingProxy::new(client, provider, config.auto_refresh));

        info!(
            discovery_url = %config.discovery_url,
            staging_dir = %config.staging_dir.display(),
            auto_refresh = config.auto_refresh,
            "Core service initialized"
        );

        Ok(Self {
            config,
            context: RwLock::new(Some(Arc::new(ServiceContext {
                credentials,
                factory,
                drive,
            }))),
        })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    async fn context(&self) -> Result<Arc<ServiceContext>> {
        self.context.read().await.clone().ok_or(CoreError::ShutDown)
    }

    /// The retrying operation set.
    pub async fn drive(&self) -> Result<Arc<Drive>> {
        Ok(self.context().await?.drive.clone())
    }

    /// Change feed cursor starting at `start_change_id`, or at the beginning.
    pub async fn change_log(&self, start_change_id: Option<i64>) -> Result<ChangeLogReader<Drive>> {
        Ok(ChangeLogReader::new(self.drive().await?, start_change_id))
    }

    /// Re-derive the credential now, outside any failing call.
    #[instrument(skip(self))]
    pub async fn refresh_credential(&self) -> Result<()> {
        let context = self.context().await?;
        context.drive.refresh_credential().await?;
        Ok(())
    }

    /// Whether the service client has been built from the discovery document.
    pub async fn is_connected(&self) -> bool {
        match self.context.read().await.as_ref() {
            Some(context) => context.factory.is_built(),
            None => false,
        }
    }

    /// Drop the memoized client and the cached credential.
    ///
    /// Later calls fail with [`CoreError::ShutDown`]. Handles obtained from
    /// [`drive`](Self::drive) before the call keep working until dropped.
    pub async fn shutdown(&self) {
        let context = self.context.write().await.take();
        if let Some(context) = context {
            context.credentials.clear().await;
            info!("Core service shut down");
        }
    }
}
