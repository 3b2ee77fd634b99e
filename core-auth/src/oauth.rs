//! OAuth 2.0 Refresh Grant
//!
//! Redeems a refresh token at the token endpoint for a new access token.
//! Acquiring the first token pair (browser consent, PKCE) is the job of the
//! host's OAuth flow and is not implemented here.
//!
//! The grant is sent exactly once per call. A transport failure or a 5xx
//! answer is reported as [`AuthError::TokenEndpointUnavailable`]; a 4xx answer
//! means the refresh token was revoked or the client is misconfigured and is
//! reported as [`AuthError::RefreshRejected`].

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::Clock;
use bytes::Bytes;
use core_runtime::config::OAuthClientConfig;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Client for the `refresh_token` grant.
pub struct RefreshGrantClient {
    config: OAuthClientConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl RefreshGrantClient {
    pub fn new(
        config: OAuthClientConfig,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    /// Exchange `refresh_token` for a fresh token set.
    ///
    /// When the endpoint does not rotate the refresh token, the one that was
    /// presented is carried over into the returned set.
    #[instrument(skip(self, refresh_token), fields(token_url = %self.config.token_url))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        debug!("Refreshing access token");

        let issued_at = self.clock.now();
        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Token endpoint unreachable");
            AuthError::TokenEndpointUnavailable(e.to_string())
        })?;

        if response.is_success() {
            let token_response: TokenResponse = response.json().map_err(|e| {
                AuthError::Other(format!("Failed to parse token response: {}", e))
            })?;

            info!(
                expires_in = token_response.expires_in,
                rotated = token_response.refresh_token.is_some(),
                "Access token refreshed"
            );

            return Ok(OAuthTokens::new(
                token_response.access_token,
                token_response
                    .refresh_token
                    .or_else(|| Some(refresh_token.to_string())),
                token_response.expires_in,
                issued_at,
            ));
        }

        let status = response.status;
        let reason = response
            .json::<TokenErrorResponse>()
            .map(|body| match body.error_description {
                Some(description) => format!("{}: {}", body.error, description),
                None => body.error,
            })
            .unwrap_or_else(|_| format!("HTTP {}", status));

        if response.is_client_error() {
            warn!(status = status, reason = %reason, "Token refresh rejected");
            Err(AuthError::RefreshRejected { status, reason })
        } else {
            warn!(status = status, reason = %reason, "Token endpoint failed");
            Err(AuthError::TokenEndpointUnavailable(format!(
                "HTTP {}: {}",
                status, reason
            )))
        }
    }
}

/// Success body of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bridge_traits::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn client(http: MockHttp) -> RefreshGrantClient {
        RefreshGrantClient::new(
            OAuthClientConfig::new("client-123").with_client_secret("s3cret"),
            Arc::new(http),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
        )
    }

    #[tokio::test]
    async fn test_refresh_sends_form_grant() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body = std::str::from_utf8(req.body.as_ref().unwrap()).unwrap();
                req.method == HttpMethod::Post
                    && req.url == "https://oauth2.googleapis.com/token"
                    && body.contains("grant_type=refresh_token")
                    && body.contains("refresh_token=old-refresh")
                    && body.contains("client_id=client-123")
                    && body.contains("client_secret=s3cret")
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"access_token":"new-access","expires_in":1800,"token_type":"Bearer"}"#,
                ))
            });

        let tokens = client(http)
            .refresh_access_token("old-refresh")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "new-access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(
            tokens.expires_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_kept() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(response(
                200,
                r#"{"access_token":"a","refresh_token":"rotated"}"#,
            ))
        });

        let tokens = client(http).refresh_access_token("old").await.unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(
            tokens.expires_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_grant_is_rejected() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(response(
                400,
                r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
            ))
        });

        let err = client(http).refresh_access_token("revoked").await.unwrap_err();
        assert!(err.is_authorization_fault());
        match err {
            AuthError::RefreshRejected { status, reason } => {
                assert_eq!(status, 400);
                assert!(reason.starts_with("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(503, "<html>unavailable</html>")));

        let err = client(http).refresh_access_token("r").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Transport("connection reset".into())));

        let err = client(http).refresh_access_token("r").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenEndpointUnavailable(_)));
    }
}
