//! Workspace entry crate.
//!
//! Host applications (typically a filesystem-translation layer) depend on
//! `gdrive-core` and get the assembled [`CoreService`] together with the types
//! they need to call into it, without wiring each workspace crate by hand.

#[cfg(feature = "desktop-shims")]
pub use core_service::{
    init_logging, CoreDependencies, CoreError, CoreService, Drive, DriveConfig, LogFormat,
    LogLevel, LoggingConfig, RemoteStore, Result,
};
