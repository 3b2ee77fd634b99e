use thiserror::Error;

/// Failures raised while setting up the runtime, before any remote call.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
