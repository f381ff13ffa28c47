//! HTTP layer: credential injection and status mapping.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::provider::AuthProvider;
use crate::types::ClientConfig;

/// HTTP backend for making requests (holds reqwest client, auth, config).
#[derive(Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) auth_provider: Option<Arc<dyn AuthProvider>>,
    pub(crate) config: ClientConfig,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field(
                "auth_provider",
                &self.auth_provider.as_ref().map(|p| p.name().to_string()),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl HttpBackend {
    /// Single GET for `artifact`; anything but 200 is a `LookupFailed`.
    pub(crate) async fn get(&self, url: &str, artifact: &str) -> RegistryResult<reqwest::Response> {
        let mut request = self.client.get(url);

        if let Some(provider) = &self.auth_provider {
            let auth = provider.provide(artifact).await?;
            debug!(provider = %auth.provider, "attaching registry credentials");
            request = request.basic_auth(auth.username, Some(auth.password));
        }

        let response = request.send().await.map_err(|e| RegistryError::Network {
            message: format!("{}: {}", url, e),
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "referrers response");

        if status != StatusCode::OK {
            return Err(RegistryError::LookupFailed {
                reference: artifact.to_string(),
                status: status.to_string(),
            });
        }

        Ok(response)
    }
}
