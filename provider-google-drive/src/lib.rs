//! # Google Drive Provider
//!
//! Gateway between a virtual-filesystem layer and the Google Drive v2 API.
//!
//! ## Overview
//!
//! - [`ServiceClientFactory`] builds the API client from the discovery
//!   document once and memoizes it
//! - [`DriveClient`] implements the [`RemoteStore`] operation set, one round
//!   trip (or one sequential loop of them) per operation
//! - [`RetryingProxy`] wraps any [`RemoteStore`] with jittered exponential
//!   backoff and a single credential refresh per call
//! - [`ChangeLogReader`] walks the change feed page by page and rejects ids
//!   that are not strictly increasing
//! - [`DownloadCache`] reuses a local copy whose mtime matches the remote one
//!
//! ## Usage
//!
//! ```ignore
//! use provider_google_drive::{DriveClient, RemoteStore, RetryingProxy, ServiceClientFactory};
//!
//! let factory = Arc::new(ServiceClientFactory::new(&config.discovery_url, credentials.clone()));
//! let client = DriveClient::new(factory, fs, clock, config.clone());
//! let drive = RetryingProxy::new(client, credentials, config.auto_refresh);
//!
//! let entries = drive.list_files(None, Some("report.pdf"), Some("root")).await?;
//! ```

pub mod cache;
pub mod changes;
pub mod client;
pub mod discovery;
mod download;
pub mod entry;
pub mod error;
pub mod proxy;
pub mod store;
pub mod types;

pub use cache::{CacheDecision, DownloadCache};
pub use changes::ChangeLogReader;
pub use client::DriveClient;
pub use discovery::{DiscoveryDocument, ServiceClient, ServiceClientFactory};
pub use entry::{
    CachedDownloadDescriptor, ChangeFeedPage, ChangeRecord, EntryOptions, EntryUpdate,
    MediaSource, NewEntry, NormalizedEntry,
};
pub use error::{DriveError, ErrorKind, Result};
pub use proxy::{RetryingProxy, MAX_ATTEMPTS};
pub use store::RemoteStore;
