use provider_google_drive::{DriveError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),

    #[error("Core service has been shut down")]
    ShutDown,
}

impl CoreError {
    /// Failure kind for errors that came out of a remote operation.
    pub fn drive_kind(&self) -> Option<ErrorKind> {
        match self {
            CoreError::Drive(e) => Some(e.kind()),
            CoreError::Config(core_runtime::Error::Config(_)) => Some(ErrorKind::Configuration),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
