//! # Credential Manager
//!
//! Owns the refreshable authorization credential and hands out authenticated
//! transports.
//!
//! ## Overview
//!
//! - [`CredentialProvider::transport`] is cheap and safe to call before every
//!   request. It checks the cached expiry locally and only contacts the token
//!   endpoint when the access token is within [`TOKEN_REFRESH_BUFFER`] of
//!   expiring.
//! - [`CredentialProvider::force_refresh`] always redeems the refresh token. It
//!   fails with an authorization fault when no token or no refresh token has
//!   been persisted, since only the host's OAuth flow can recover from that.
//! - Refreshes are serialized behind a mutex; a caller that waited on the lock
//!   re-checks the cache before redeeming again.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{CredentialManager, CredentialProvider};
//!
//! let manager = CredentialManager::new(oauth_config, http_client, secure_store, clock);
//! let transport = manager.transport().await?;
//! let response = transport.execute(request).await?;
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::RefreshGrantClient;
use crate::token_store::TokenStore;
use crate::types::OAuthTokens;
use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult,
    http::{HttpClient, HttpRequest, HttpResponse},
    storage::SecureStore,
    time::Clock,
};
use core_runtime::config::OAuthClientConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Refresh this long before the access token actually expires
pub const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// HTTP client bound to one access token.
///
/// Cloning is cheap; the underlying client is shared.
#[derive(Clone)]
pub struct AuthenticatedTransport {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
}

impl AuthenticatedTransport {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Send `request` with the bearer token attached.
    pub async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.http_client
            .execute(request.bearer_token(self.access_token.as_str()))
            .await
    }
}

impl fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Source of authenticated transports.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Transport carrying a currently valid access token.
    async fn transport(&self) -> Result<AuthenticatedTransport>;

    /// Re-derive the credential from the persisted refresh token.
    async fn force_refresh(&self) -> Result<()>;
}

/// Default [`CredentialProvider`] backed by a [`TokenStore`] and the refresh grant.
pub struct CredentialManager {
    http_client: Arc<dyn HttpClient>,
    token_store: TokenStore,
    refresher: RefreshGrantClient,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<OAuthTokens>>,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        oauth: OAuthClientConfig,
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_token_store(oauth, http_client, TokenStore::new(secure_store), clock)
    }

    pub fn with_token_store(
        oauth: OAuthClientConfig,
        http_client: Arc<dyn HttpClient>,
        token_store: TokenStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let refresher = RefreshGrantClient::new(oauth, http_client.clone(), clock.clone());
        Self {
            http_client,
            token_store,
            refresher,
            clock,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Forget the in-memory credential. The persisted tokens are kept.
    pub async fn clear(&self) {
        *self.cached.write().await = None;
        debug!("Cleared cached credential");
    }

    fn needs_refresh(&self, tokens: &OAuthTokens) -> bool {
        tokens.is_expired_at(self.clock.now(), TOKEN_REFRESH_BUFFER.as_secs() as i64)
    }

    /// Cached tokens, falling back to the secure store on first use.
    async fn current_tokens(&self) -> Result<OAuthTokens> {
        if let Some(tokens) = self.cached.read().await.as_ref() {
            return Ok(tokens.clone());
        }

        let tokens = self.token_store.retrieve_tokens().await?.ok_or_else(|| {
            warn!("No persisted credential; the OAuth flow has not run yet");
            AuthError::NotAuthenticated
        })?;

        *self.cached.write().await = Some(tokens.clone());
        Ok(tokens)
    }

    /// Redeem the refresh token of `tokens`. Caller holds `refresh_lock`.
    async fn refresh_locked(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            warn!("Credential has no refresh token");
            AuthError::NoRefreshToken
        })?;

        let refreshed = self.refresher.refresh_access_token(refresh_token).await?;
        self.token_store.store_tokens(&refreshed).await?;
        *self.cached.write().await = Some(refreshed.clone());

        info!(expires_at = %refreshed.expires_at, "Credential refreshed");
        Ok(refreshed)
    }

    fn transport_for(&self, tokens: &OAuthTokens) -> AuthenticatedTransport {
        AuthenticatedTransport::new(self.http_client.clone(), tokens.access_token.as_str())
    }
}

#[async_trait]
impl CredentialProvider for CredentialManager {
    #[instrument(skip(self))]
    async fn transport(&self) -> Result<AuthenticatedTransport> {
        let tokens = self.current_tokens().await?;
        if !self.needs_refresh(&tokens) {
            return Ok(self.transport_for(&tokens));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock.
        let tokens = self.current_tokens().await?;
        if !self.needs_refresh(&tokens) {
            debug!("Credential refreshed by a concurrent caller");
            return Ok(self.transport_for(&tokens));
        }

        info!("Access token expired or expiring soon, refreshing");
        let refreshed = self.refresh_locked(&tokens).await?;
        Ok(self.transport_for(&refreshed))
    }

    #[instrument(skip(self))]
    async fn force_refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        let tokens = self.current_tokens().await?;
        self.refresh_locked(&tokens).await?;
        Ok(())
    }
}
