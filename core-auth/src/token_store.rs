//! Secure Token Storage
//!
//! Persists the OAuth token set through the host's [`SecureStore`]. The
//! external OAuth flow writes the initial tokens; the credential manager reads
//! them on first use and writes back every refreshed set.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{OAuthTokens, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! let tokens = OAuthTokens::new(
//!     "access_token_value".to_string(),
//!     Some("refresh_token_value".to_string()),
//!     3600,
//!     chrono::Utc::now(),
//! );
//!
//! token_store.store_tokens(&tokens).await?;
//! let retrieved = token_store.retrieve_tokens().await?;
//! token_store.delete_tokens().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::storage::SecureStore;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const KEY_PREFIX: &str = "gdrive-core.oauth";
const DEFAULT_ACCOUNT: &str = "default";

/// Secure storage for the OAuth token set of one account.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    account: String,
}

/// On-disk JSON shape, shared with the external OAuth flow.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
    /// Unix seconds
    expires_at: i64,
}

impl TokenStore {
    /// Token store for the default account
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self::for_account(secure_store, DEFAULT_ACCOUNT)
    }

    pub fn for_account(secure_store: Arc<dyn SecureStore>, account: impl Into<String>) -> Self {
        let account = account.into();
        debug!(account = %account, "Initializing TokenStore");
        Self {
            secure_store,
            account,
        }
    }

    /// Store the token set, securely overwriting any previous value.
    pub async fn store_tokens(&self, tokens: &OAuthTokens) -> Result<()> {
        let stored = StoredTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at.timestamp(),
        };

        let json = serde_json::to_vec(&stored)
            .map_err(|e| AuthError::Other(format!("Failed to serialize tokens: {}", e)))?;

        self.secure_store
            .set_secret(&self.storage_key(), &json)
            .await
            .map_err(|e| {
                warn!(account = %self.account, error = %e, "Failed to store tokens");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            account = %self.account,
            has_refresh_token = stored.refresh_token.is_some(),
            "Tokens stored securely"
        );

        Ok(())
    }

    /// Retrieve the token set.
    ///
    /// Returns `Ok(None)` when nothing has been stored. Data that no longer
    /// parses is deleted and reported as [`AuthError::TokenCorrupted`], which
    /// sends the host back through its sign-in flow.
    pub async fn retrieve_tokens(&self) -> Result<Option<OAuthTokens>> {
        let key = self.storage_key();

        let data = self.secure_store.get_secret(&key).await.map_err(|e| {
            warn!(account = %self.account, error = %e, "Failed to read tokens");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(account = %self.account, "No tokens found in storage");
            return Ok(None);
        };

        let stored: StoredTokens = match serde_json::from_slice(&data) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    account = %self.account,
                    error = %e,
                    "Stored tokens do not parse, deleting them"
                );
                if let Err(delete_err) = self.secure_store.delete_secret(&key).await {
                    warn!(error = %delete_err, "Failed to delete corrupted token data");
                }
                return Err(AuthError::TokenCorrupted(e.to_string()));
            }
        };

        let expires_at = Utc
            .timestamp_opt(stored.expires_at, 0)
            .single()
            .ok_or_else(|| {
                AuthError::TokenCorrupted(format!("invalid expiry {}", stored.expires_at))
            })?;

        debug!(
            account = %self.account,
            expires_at = stored.expires_at,
            "Tokens retrieved"
        );

        Ok(Some(OAuthTokens {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at,
        }))
    }

    /// Delete the token set. Succeeds when nothing is stored.
    pub async fn delete_tokens(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.storage_key())
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        info!(account = %self.account, "Tokens deleted");
        Ok(())
    }

    pub async fn has_tokens(&self) -> Result<bool> {
        self.secure_store
            .has_secret(&self.storage_key())
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }

    fn storage_key(&self) -> String {
        format!("{}.{}", KEY_PREFIX, self.account)
    }
}
