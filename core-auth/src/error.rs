use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential has been persisted yet; the external OAuth flow must run first.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token endpoint rejected refresh ({status}): {reason}")]
    RefreshRejected { status: u16, reason: String },

    #[error("Token endpoint unavailable: {0}")]
    TokenEndpointUnavailable(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored credential is corrupted: {0}")]
    TokenCorrupted(String),

    #[error("Authentication error: {0}")]
    Other(String),
}

impl AuthError {
    /// The credential cannot be made valid without user interaction.
    pub fn is_authorization_fault(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated
                | AuthError::NoRefreshToken
                | AuthError::RefreshRejected { .. }
                | AuthError::TokenCorrupted(_)
        )
    }

    /// The token endpoint could not be reached; the same refresh may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::TokenEndpointUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
