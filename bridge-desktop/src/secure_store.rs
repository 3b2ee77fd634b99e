//! Secure Storage Implementation using OS keychain

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::debug;

/// Keyring-based secure storage implementation
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service API
///
/// Secrets are stored as raw bytes under `<service_name>/<key>`.
pub struct KeyringSecureStore {
    service_name: String,
}

impl KeyringSecureStore {
    pub const DEFAULT_SERVICE_NAME: &'static str = "gdrive-core";

    /// Create a new secure store with the default service name
    pub fn new() -> Self {
        Self::with_service_name(Self::DEFAULT_SERVICE_NAME)
    }

    /// Create a new secure store with a custom service name
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            BridgeError::NotAvailable(format!("Keychain entry unavailable: {}", e))
        })
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_secret(value)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to store secret: {}", e)))?;

        debug!(key = key, "Stored secret");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entry(key)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(BridgeError::OperationFailed(format!(
                "Failed to read secret: {}",
                e
            ))),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Deleted secret");
                Ok(())
            }
            Err(e) => Err(BridgeError::OperationFailed(format!(
                "Failed to delete secret: {}",
                e
            ))),
        }
    }
}
