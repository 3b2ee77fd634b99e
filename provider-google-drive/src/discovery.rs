//! Service client construction
//!
//! The API base URL is not hard-coded: it comes from the discovery document
//! fetched on first use. The built client is memoized for the lifetime of the
//! factory; a failed build is not cached.

use crate::error::{classify_http_failure, DriveError, Result};
use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
use core_auth::CredentialProvider;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// The fields of a discovery document this crate relies on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryDocument {
    pub name: String,
    pub version: String,
    pub root_url: String,
    pub service_path: String,
}

impl DiscoveryDocument {
    pub fn api_base(&self) -> String {
        format!("{}{}", self.root_url, self.service_path)
    }

    /// Media uploads go to `{rootUrl}upload/{servicePath}`.
    pub fn upload_base(&self) -> String {
        format!("{}upload/{}", self.root_url, self.service_path)
    }
}

/// Typed client bound to one discovery description.
///
/// Each request asks the credential provider for a transport, so a refreshed
/// credential takes effect on the next request without rebuilding the client.
pub struct ServiceClient {
    api_base: String,
    upload_base: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ServiceClient {
    pub fn new(
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            upload_base: upload_base.into(),
            credentials,
        }
    }

    /// `{api_base}{path}`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// `{upload_base}{path}`
    pub fn upload_url(&self, path: &str) -> String {
        format!("{}{}", self.upload_base, path)
    }

    /// Send `request` over a freshly obtained transport, whatever the status.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let transport = self.credentials.transport().await?;
        Ok(transport.execute(request).await?)
    }

    /// Send `request` and turn any non-2xx answer into a classified error.
    ///
    /// `subject` names the addressed resource in not-found errors.
    pub async fn execute(&self, request: HttpRequest, subject: &str) -> Result<HttpResponse> {
        let method = request.method;
        let response = self.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let error = classify_http_failure(response.status, &response.body, subject);
        debug!(
            ?method,
            status = response.status,
            kind = ?error.kind(),
            subject,
            "Request failed"
        );
        Err(error)
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: String, subject: &str) -> Result<T> {
        let response = self
            .execute(HttpRequest::new(HttpMethod::Get, url), subject)
            .await?;
        decode(&response, subject)
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .finish()
    }
}

pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse, subject: &str) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        DriveError::InvalidResponse(format!("failed to decode {} response: {}", subject, e))
    })
}

/// Builds the [`ServiceClient`] once and hands out the memoized instance.
pub struct ServiceClientFactory {
    discovery_url: String,
    credentials: Arc<dyn CredentialProvider>,
    client: OnceCell<Arc<ServiceClient>>,
}

impl ServiceClientFactory {
    pub fn new(discovery_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            discovery_url: discovery_url.into(),
            credentials,
            client: OnceCell::new(),
        }
    }

    /// The memoized client, building it on first use.
    ///
    /// Concurrent first callers wait for a single build. If the build fails,
    /// the error propagates and the next call tries again.
    pub async fn get_client(&self) -> Result<Arc<ServiceClient>> {
        self.client
            .get_or_try_init(|| self.build())
            .await
            .map(Arc::clone)
    }

    pub fn is_built(&self) -> bool {
        self.client.initialized()
    }

    #[instrument(skip(self), fields(discovery_url = %self.discovery_url))]
    async fn build(&self) -> Result<Arc<ServiceClient>> {
        info!("Fetching discovery document");

        let transport = self.credentials.transport().await?;
        let response = transport
            .execute(HttpRequest::new(HttpMethod::Get, self.discovery_url.clone()))
            .await
            .map_err(|e| {
                warn!(error = %e, "Discovery fetch failed");
                DriveError::from(e)
            })?;

        if !response.is_success() {
            return Err(classify_http_failure(
                response.status,
                &response.body,
                &self.discovery_url,
            ));
        }

        let document: DiscoveryDocument = decode(&response, "discovery")?;
        info!(
            api = %document.name,
            version = %document.version,
            api_base = %document.api_base(),
            "Service client built"
        );

        Ok(Arc::new(ServiceClient::new(
            document.api_base(),
            document.upload_base(),
            self.credentials.clone(),
        )))
    }
}
