//! # Host Bridge Traits
//!
//! Capability traits the drive gateway core needs from its host.
//!
//! ## Overview
//!
//! The core never talks to sockets, disks or keychains directly. Every such
//! capability is expressed as a trait here and injected at construction time,
//! which keeps the remote-store logic testable against scripted fakes and lets
//! each host ship its own adapters.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP round trips
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Staging directory I/O and
//!   modification-time bookkeeping for downloads
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Secret Service)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! must report failures that happened below the HTTP layer (connection reset,
//! TLS, malformed response) as [`BridgeError::Transport`] so the retry policy
//! upstream can tell them apart from local I/O failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared by every task that calls into the core.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{FileMetadata, FileSystemAccess, SecureStore};
pub use time::{Clock, FixedClock, SystemClock};
