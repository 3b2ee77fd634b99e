//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the drive gateway core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast validation
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the validated configuration
//! surface shared by the auth, provider and service crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{DriveConfig, DriveConfigBuilder, OAuthClientConfig};
pub use error::{Error, Result};
