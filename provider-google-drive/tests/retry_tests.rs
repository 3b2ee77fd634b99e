//! Integration tests for the retry policy of the proxied operation set

mod common;

use common::{config, file_json, harness};
use core_auth::AuthError;
use provider_google_drive::{DriveError, ErrorKind, RemoteStore, MAX_ATTEMPTS};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const UNAUTHORIZED: &str =
    r#"{"error":{"code":401,"message":"Invalid Credentials","errors":[{"reason":"authError"}]}}"#;
const RATE_LIMITED: &str = r#"{"error":{"code":403,"message":"User Rate Limit Exceeded","errors":[{"reason":"userRateLimitExceeded"}]}}"#;

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success_on_fifth_attempt() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));

    h.http.push_transport_error("connection reset by peer");
    h.http.push_json(403, RATE_LIMITED);
    h.http.push_transport_error("tls handshake eof");
    h.http.push_json(403, RATE_LIMITED);
    h.http.push_json(200, &file_json("f1", "final", &[]));

    let started = Instant::now();
    let entry = h.drive.get_entry("f1").await.unwrap();

    assert_eq!(entry.title, "final");
    assert_eq!(h.http.api_calls(), MAX_ATTEMPTS as usize);
    assert!(started.elapsed() >= Duration::from_secs(1 + 2 + 4 + 8));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_budget_surfaces_last_error() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));
    for _ in 0..MAX_ATTEMPTS {
        h.http.push_transport_error("connection reset by peer");
    }

    let err = h.drive.get_about().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientTransport);
    assert_eq!(h.http.api_calls(), MAX_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_double_authorization_fault_refreshes_once() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));
    h.http.push_json(401, UNAUTHORIZED);
    h.http.push_json(401, UNAUTHORIZED);

    let err = h.drive.get_entry("f1").await.unwrap_err();

    assert!(matches!(err, DriveError::AuthorizationFault(ref m) if m == "Invalid Credentials"));
    assert_eq!(h.credentials.refreshes(), 1);
    assert_eq!(h.http.api_calls(), 2);
}

#[tokio::test]
async fn test_refresh_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));
    h.http.push_json(401, UNAUTHORIZED);
    h.credentials.fail_next_refresh(AuthError::NoRefreshToken);

    let err = h.drive.get_entry("f1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthorizationFault);
    assert_eq!(h.http.api_calls(), 1);
}

#[tokio::test]
async fn test_auto_refresh_disabled_propagates_first_fault() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(dir.path(), &[], 1024);
    cfg.auto_refresh = false;
    let h = harness(cfg);
    h.http.push_json(401, UNAUTHORIZED);

    let err = h.drive.get_entry("f1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthorizationFault);
    assert_eq!(h.credentials.refreshes(), 0);
}

#[tokio::test]
async fn test_non_json_error_body_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));
    h.http.push_json(502, "<html><body>Bad Gateway</body></html>");

    let err = h.drive.get_entry("f1").await.unwrap_err();

    assert!(matches!(err, DriveError::MalformedErrorBody { status_code: 502, .. }));
    assert_eq!(h.http.api_calls(), 1);
}

#[tokio::test]
async fn test_delete_of_missing_entry_is_not_found() {
    let dir = TempDir::new().unwrap();
    let h = harness(config(dir.path(), &[], 1024));
    h.http.push_json(
        404,
        r#"{"error":{"code":404,"message":"File not found: f1","errors":[{"reason":"notFound"}]}}"#,
    );

    let err = h.drive.delete_entry("f1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.http.api_calls(), 1);
}
