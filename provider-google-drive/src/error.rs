//! Error types for the Google Drive gateway
//!
//! Every failure carries a discriminated [`ErrorKind`]. The retry proxy decides
//! what to do purely from the kind, and callers map kinds onto user-visible
//! outcomes ("no such file", "permission denied", "I/O error").
//!
//! HTTP failures are classified from the status code and the structured error
//! body the service returns:
//!
//! ```json
//! {"error": {"code": 403, "message": "...", "errors": [{"reason": "rateLimitExceeded"}]}}
//! ```

use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use serde::Deserialize;
use thiserror::Error;

/// Service reasons that mean "slow down", not "forbidden"
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Longest body excerpt kept in an error message
const BODY_EXCERPT_LIMIT: usize = 512;

/// Failure taxonomy shared by every remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection reset, malformed response, TLS failure; retried with backoff
    TransientTransport,
    /// HTTP 403 with a rate-limit reason; retried with backoff
    RateLimit,
    /// Credential expired or invalid; one refresh-and-retry per call
    AuthorizationFault,
    /// Requested MIME type cannot be exported
    ExportFormat,
    /// Remote resource is absent
    NotFound,
    /// Change feed ids out of order
    ConsistencyViolation,
    /// Invalid arguments or configuration, caught before any network call
    Configuration,
    /// Anything else; never retried
    Other,
}

impl ErrorKind {
    /// Whether the retry proxy backs off and tries again
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientTransport | ErrorKind::RateLimit)
    }
}

/// Google Drive gateway errors
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Rate limit exceeded ({reason}): {message}")]
    RateLimited { reason: String, message: String },

    #[error("Authorization fault: {0}")]
    AuthorizationFault(String),

    #[error("Credential error: {0}")]
    Credential(#[from] AuthError),

    #[error("Entry {entry_id} can not be exported to {requested}; available types: {available:?}")]
    ExportFormat {
        entry_id: String,
        requested: String,
        available: Vec<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Change {change_id} is not greater than preceding change {previous}")]
    OutOfOrderChange { change_id: i64, previous: i64 },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Google Drive API error (status {status_code}, reason {reason}): {message}")]
    Api {
        status_code: u16,
        reason: String,
        message: String,
    },

    #[error("Unstructured error body (status {status_code}): {body}")]
    MalformedErrorBody { status_code: u16, body: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Bridge(BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, DriveError>;

impl DriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::Transport(_) => ErrorKind::TransientTransport,
            DriveError::RateLimited { .. } => ErrorKind::RateLimit,
            DriveError::AuthorizationFault(_) => ErrorKind::AuthorizationFault,
            DriveError::Credential(e) if e.is_transient() => ErrorKind::TransientTransport,
            DriveError::Credential(e) if e.is_authorization_fault() => {
                ErrorKind::AuthorizationFault
            }
            DriveError::ExportFormat { .. } => ErrorKind::ExportFormat,
            DriveError::NotFound(_) => ErrorKind::NotFound,
            DriveError::OutOfOrderChange { .. } => ErrorKind::ConsistencyViolation,
            DriveError::InvalidArguments(_) => ErrorKind::Configuration,
            DriveError::Credential(_)
            | DriveError::Api { .. }
            | DriveError::MalformedErrorBody { .. }
            | DriveError::InvalidResponse(_)
            | DriveError::Bridge(_) => ErrorKind::Other,
        }
    }
}

impl From<BridgeError> for DriveError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Transport(msg) => DriveError::Transport(msg),
            other => DriveError::Bridge(other),
        }
    }
}

impl From<std::io::Error> for DriveError {
    fn from(error: std::io::Error) -> Self {
        DriveError::Bridge(BridgeError::Io(error))
    }
}

impl From<DriveError> for BridgeError {
    fn from(error: DriveError) -> Self {
        match error {
            DriveError::Transport(msg) => BridgeError::Transport(msg),
            DriveError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

/// `{"error": {...}}`
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Classify a non-2xx response.
///
/// `subject` names the resource the request addressed and ends up in
/// not-found errors.
pub(crate) fn classify_http_failure(status: u16, body: &[u8], subject: &str) -> DriveError {
    let envelope = serde_json::from_slice::<GoogleErrorEnvelope>(body).ok();

    match (status, envelope) {
        (401, envelope) => DriveError::AuthorizationFault(
            envelope
                .map(|e| e.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "HTTP 401".to_string()),
        ),
        (404, _) => DriveError::NotFound(subject.to_string()),
        (_, None) => DriveError::MalformedErrorBody {
            status_code: status,
            body: body_excerpt(body),
        },
        (_, Some(GoogleErrorEnvelope { error })) => {
            let reason = error
                .errors
                .first()
                .map(|detail| detail.reason.clone())
                .unwrap_or_default();

            if status == 403 && RATE_LIMIT_REASONS.contains(&reason.as_str()) {
                DriveError::RateLimited {
                    reason,
                    message: error.message,
                }
            } else {
                DriveError::Api {
                    status_code: status,
                    reason,
                    message: error.message,
                }
            }
        }
    }
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_error(code: u16, reason: &str) -> Vec<u8> {
        format!(
            r#"{{"error":{{"code":{code},"message":"msg-{reason}","errors":[{{"domain":"usageLimits","reason":"{reason}"}}]}}}}"#
        )
        .into_bytes()
    }

    #[test]
    fn test_rate_limit_reasons() {
        for reason in ["rateLimitExceeded", "userRateLimitExceeded"] {
            let error = classify_http_failure(403, &google_error(403, reason), "files/x");
            assert_eq!(error.kind(), ErrorKind::RateLimit, "reason {reason}");
        }
    }

    #[test]
    fn test_forbidden_without_rate_reason_is_not_retried() {
        let error = classify_http_failure(403, &google_error(403, "insufficientPermissions"), "x");

        assert_eq!(error.kind(), ErrorKind::Other);
        assert!(matches!(
            error,
            DriveError::Api { status_code: 403, ref reason, .. } if reason == "insufficientPermissions"
        ));
    }

    #[test]
    fn test_unauthorized_is_authorization_fault() {
        let error = classify_http_failure(401, &google_error(401, "authError"), "about");
        assert_eq!(error.kind(), ErrorKind::AuthorizationFault);

        let bare = classify_http_failure(401, b"", "about");
        assert_eq!(bare.kind(), ErrorKind::AuthorizationFault);
    }

    #[test]
    fn test_not_found_is_distinct() {
        let error = classify_http_failure(404, &google_error(404, "notFound"), "files/abc");

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.to_string(), "Not found: files/abc");
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let error = classify_http_failure(500, b"<html>Bad Gateway</html>", "files");

        assert_eq!(error.kind(), ErrorKind::Other);
        assert!(matches!(error, DriveError::MalformedErrorBody { status_code: 500, .. }));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(2000);
        match classify_http_failure(502, body.as_bytes(), "files") {
            DriveError::MalformedErrorBody { body, .. } => assert_eq!(body.len(), 515),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bridge_conversions() {
        let transient: DriveError = BridgeError::Transport("reset".into()).into();
        assert_eq!(transient.kind(), ErrorKind::TransientTransport);

        let local: DriveError = BridgeError::OperationFailed("disk full".into()).into();
        assert_eq!(local.kind(), ErrorKind::Other);

        let back: BridgeError = DriveError::NotFound("x".into()).into();
        assert!(matches!(back, BridgeError::OperationFailed(_)));
    }

    #[test]
    fn test_credential_errors_keep_their_kind() {
        assert_eq!(
            DriveError::from(AuthError::NoRefreshToken).kind(),
            ErrorKind::AuthorizationFault
        );
        assert_eq!(
            DriveError::from(AuthError::TokenEndpointUnavailable("down".into())).kind(),
            ErrorKind::TransientTransport
        );
        assert_eq!(
            DriveError::from(AuthError::SecureStorageUnavailable("locked".into())).kind(),
            ErrorKind::Other
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::TransientTransport.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(!ErrorKind::AuthorizationFault.is_retryable());
        assert!(!ErrorKind::ConsistencyViolation.is_retryable());
    }

    #[test]
    fn test_invalid_arguments_are_configuration() {
        let err = DriveError::InvalidArguments("query_contains and query_is".into());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.kind().is_retryable());
    }
}
