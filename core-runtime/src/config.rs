//! # Drive Configuration Module
//!
//! Provides the validated configuration consumed by the drive gateway core.
//!
//! ## Overview
//!
//! The configuration uses a builder pattern to construct a [`DriveConfig`].
//! Validation is fail-fast: every problem is reported from [`DriveConfigBuilder::build`]
//! before any network call can be attempted, so a bad value never surfaces later
//! as a confusing remote failure.
//!
//! ## Required Values
//!
//! - Discovery URL (use [`DRIVE_V2_DISCOVERY_URL`] for the public service)
//! - Local staging directory for downloads
//! - OAuth client registration used by the refresh grant
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{DriveConfig, OAuthClientConfig, DRIVE_V2_DISCOVERY_URL};
//!
//! let config = DriveConfig::builder()
//!     .discovery_url(DRIVE_V2_DISCOVERY_URL)
//!     .staging_dir("/tmp/gdrive-staging")
//!     .oauth(OAuthClientConfig::new("client-id.apps.googleusercontent.com"))
//!     .hidden_flags(["trashed", "hidden"])
//!     .build()
//!     .expect("valid configuration");
//!
//! assert!(config.auto_refresh);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::DriveConfig;
//!
//! // Missing discovery URL, staging directory and OAuth client
//! DriveConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required values");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Discovery document of the Drive v2 REST API
pub const DRIVE_V2_DISCOVERY_URL: &str =
    "https://www.googleapis.com/discovery/v1/apis/drive/v2/rest";

/// Google's OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// MIME type assigned to files created without an explicit type
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// MIME type the service uses to mark folders
pub const DIRECTORY_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Default size of one ranged download request (512 KiB)
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: u64 = 512 * 1024;

/// OAuth client registration used to redeem refresh tokens.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl OAuthClientConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Configuration for the drive gateway core.
///
/// Use [`DriveConfig::builder`] to construct instances.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// URL of the service discovery document fetched at client build time
    pub discovery_url: String,

    /// Directory downloads are staged into when the caller does not pick a path
    pub staging_dir: PathBuf,

    /// MIME type for files created without an explicit type
    pub default_file_mime_type: String,

    /// MIME type marking a directory entry
    pub directory_mime_type: String,

    /// Label names that exclude an entry from listings when set
    pub hidden_flags: Vec<String>,

    /// Refresh the credential once per call on an authorization fault
    pub auto_refresh: bool,

    /// Bytes requested per ranged download round trip
    pub download_chunk_size: u64,

    /// OAuth client used by the refresh grant
    pub oauth: OAuthClientConfig,
}

impl DriveConfig {
    /// Creates a new builder for constructing a `DriveConfig`.
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Discovery and token URLs are absolute http(s) URLs
    /// - Staging directory is not empty
    /// - MIME markers are not empty
    /// - Hidden flag names are not blank
    /// - Download chunk size is greater than zero
    /// - OAuth client id is present
    pub fn validate(&self) -> Result<()> {
        validate_url("Discovery URL", &self.discovery_url)?;

        if self.staging_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Staging directory cannot be empty".to_string(),
            ));
        }

        if self.default_file_mime_type.trim().is_empty() {
            return Err(Error::Config(
                "Default file MIME type cannot be empty".to_string(),
            ));
        }

        if self.directory_mime_type.trim().is_empty() {
            return Err(Error::Config(
                "Directory MIME type cannot be empty".to_string(),
            ));
        }

        if let Some(flag) = self.hidden_flags.iter().find(|f| f.trim().is_empty()) {
            return Err(Error::Config(format!(
                "Hidden flag names cannot be blank (got {:?})",
                flag
            )));
        }

        if self.download_chunk_size == 0 {
            return Err(Error::Config(
                "Download chunk size must be greater than 0 bytes".to_string(),
            ));
        }

        if self.oauth.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client id cannot be empty".to_string()));
        }

        validate_url("OAuth token URL", &self.oauth.token_url)?;

        Ok(())
    }
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", name)));
    }

    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(Error::Config(format!(
            "{} must be an absolute http(s) URL, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Builder for [`DriveConfig`].
#[derive(Default)]
pub struct DriveConfigBuilder {
    discovery_url: Option<String>,
    staging_dir: Option<PathBuf>,
    default_file_mime_type: Option<String>,
    directory_mime_type: Option<String>,
    hidden_flags: Option<Vec<String>>,
    auto_refresh: Option<bool>,
    download_chunk_size: Option<u64>,
    oauth: Option<OAuthClientConfig>,
}

impl DriveConfigBuilder {
    /// Sets the discovery document URL (required).
    pub fn discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = Some(url.into());
        self
    }

    /// Sets the download staging directory (required).
    pub fn staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    pub fn default_file_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.default_file_mime_type = Some(mime_type.into());
        self
    }

    pub fn directory_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.directory_mime_type = Some(mime_type.into());
        self
    }

    /// Replaces the label names used to hide entries from listings.
    ///
    /// Defaults to `["trashed"]`.
    pub fn hidden_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_flags = Some(flags.into_iter().map(Into::into).collect());
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = Some(enabled);
        self
    }

    pub fn download_chunk_size(mut self, bytes: u64) -> Self {
        self.download_chunk_size = Some(bytes);
        self
    }

    /// Sets the OAuth client registration (required).
    pub fn oauth(mut self, oauth: OAuthClientConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required value is missing or any value
    /// fails [`DriveConfig::validate`].
    pub fn build(self) -> Result<DriveConfig> {
        let discovery_url = self.discovery_url.ok_or_else(|| {
            Error::Config("Discovery URL is required. Use .discovery_url() to set it.".to_string())
        })?;

        let staging_dir = self.staging_dir.ok_or_else(|| {
            Error::Config("Staging directory is required. Use .staging_dir() to set it.".to_string())
        })?;

        let oauth = self.oauth.ok_or_else(|| {
            Error::Config("OAuth client is required. Use .oauth() to set it.".to_string())
        })?;

        let config = DriveConfig {
            discovery_url,
            staging_dir,
            default_file_mime_type: self
                .default_file_mime_type
                .unwrap_or_else(|| DEFAULT_FILE_MIME_TYPE.to_string()),
            directory_mime_type: self
                .directory_mime_type
                .unwrap_or_else(|| DIRECTORY_MIME_TYPE.to_string()),
            hidden_flags: self
                .hidden_flags
                .unwrap_or_else(|| vec!["trashed".to_string()]),
            auto_refresh: self.auto_refresh.unwrap_or(true),
            download_chunk_size: self
                .download_chunk_size
                .unwrap_or(DEFAULT_DOWNLOAD_CHUNK_SIZE),
            oauth,
        };

        config.validate()?;

        Ok(config)
    }
}
