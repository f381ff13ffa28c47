//! Referrers client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::provider::AuthProvider;
use crate::reference::{validate_digest, ArtifactReference};
use crate::types::{ClientConfig, ReferrerRecord, ReferrersResponse};

mod helpers;
mod http;

use helpers::{normalize_referrers, referrers_url};
use http::HttpBackend;

pub const REGISTRY_USER_AGENT: &str = concat!("registry-auth/", env!("CARGO_PKG_VERSION"));

/// Client for the `_ext/oci-artifacts` referrers API.
#[derive(Debug, Clone)]
pub struct ReferrersClient {
    http: HttpBackend,
}

impl ReferrersClient {
    pub fn new(config: ClientConfig) -> RegistryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(REGISTRY_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RegistryError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                auth_provider: None,
                config,
            },
        })
    }

    pub fn from_env() -> RegistryResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Authenticate lookups with credentials from `provider`.
    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.http.auth_provider = Some(provider);
        self
    }

    /// List manifests referring to `digest` in `reference`'s repository.
    ///
    /// Issues exactly one request and never retries. The registry's subject
    /// digest must equal `digest`, otherwise the whole result is rejected.
    ///
    /// `artifact_types` and `next_token` are accepted for forward
    /// compatibility but are not sent: the registry is asked for every
    /// referrer, in a single page.
    pub async fn get_referrers(
        &self,
        reference: &ArtifactReference,
        digest: &str,
        artifact_types: &[String],
        next_token: Option<&str>,
    ) -> RegistryResult<Vec<ReferrerRecord>> {
        validate_digest(digest).map_err(|reason| RegistryError::InvalidReference {
            reference: reference.original.clone(),
            reason,
        })?;

        if !artifact_types.is_empty() || next_token.is_some() {
            debug!(
                artifact_types = ?artifact_types,
                next_token = ?next_token,
                "referrer filters and pagination are not applied"
            );
        }

        let url = referrers_url(self.http.config.scheme(), reference, digest);
        debug!(url = %url, "fetching referrers");

        let response = self.http.get(&url, &reference.original).await?;

        let text = response.text().await?;
        let body: ReferrersResponse =
            serde_json::from_str(&text).map_err(|e| RegistryError::InvalidResponse {
                message: format!("failed to parse referrers response: {}", e),
            })?;

        normalize_referrers(body, digest)
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.auth_provider.is_some()
    }
}
