//! # Authentication Module
//!
//! Keeps the drive authorization credential valid across long-running sessions.
//!
//! ## Overview
//!
//! The OAuth browser flow lives outside this crate: it persists its tokens through
//! a [`SecureStore`](bridge_traits::SecureStore), and [`CredentialManager`] picks
//! them up from there. Every call to [`CredentialProvider::transport`] performs a
//! cheap local expiry check and only talks to the token endpoint when the access
//! token is about to lapse. [`CredentialProvider::force_refresh`] redeems the
//! refresh token unconditionally and is what the retry layer calls after the
//! service reports an authorization fault.
//!
//! ## Features
//!
//! - Refresh-token grant against a configurable token endpoint
//! - Serialized refreshes, so concurrent callers never redeem the same token twice
//! - Secure token persistence via the host's secure store
//! - Tokens are redacted from `Debug` output and never logged

pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::{AuthenticatedTransport, CredentialManager, CredentialProvider};
pub use oauth::RefreshGrantClient;
pub use token_store::TokenStore;
pub use types::OAuthTokens;
