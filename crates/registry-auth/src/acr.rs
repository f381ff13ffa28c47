//! Alibaba Cloud ACR basic-auth provider.
//!
//! Credentials are obtained through RRSA (OIDC role federation) by a
//! [`TokenIssuer`], cached per registry host, and refreshed lazily once a
//! token is within [`refresh_window`] of expiring.
//!
//! # Configuration
//!
//! ```json
//! { "name": "alibabacloudAcrBasic", "instanceID": "cri-xxxxxxxx" }
//! ```
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `ALIBABA_CLOUD_ACR_INSTANCE_ID` | Fallback when `instanceID` is not configured |
//! | `ALIBABA_CLOUD_ROLE_ARN` | RAM role assumed at fetch time |
//! | `ALIBABA_CLOUD_OIDC_PROVIDER_ARN` | OIDC provider at fetch time |
//! | `ALIBABA_CLOUD_OIDC_TOKEN_FILE` | OIDC token file at fetch time |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::cache::{CachedToken, TokenCache};
use crate::error::{RegistryError, RegistryResult};
use crate::identity::{registry_host, RegistryIdentity};
use crate::issuer::{FederationEnv, TokenIssuer, TokenRequest};
use crate::provider::{AuthConfig, AuthProvider, AuthProviderFactory};

/// Registered provider name.
pub const PROVIDER_NAME: &str = "alibabacloudAcrBasic";

/// Fallback source for the ACR instance id.
pub const ENV_INSTANCE_ID: &str = "ALIBABA_CLOUD_ACR_INSTANCE_ID";

/// Minutes before expiry at which a cached token counts as stale.
pub const REFRESH_WINDOW_MINUTES: i64 = 5;

/// Lead time before expiry at which a cached token counts as stale.
pub fn refresh_window() -> chrono::Duration {
    chrono::Duration::minutes(REFRESH_WINDOW_MINUTES)
}

/// ACR OpenAPI endpoint for a region.
pub fn regional_endpoint(region: &str) -> String {
    format!("cr.{}.aliyuncs.com", region)
}

/// Whether a token expiring at `expires_at` must be refreshed at `now`.
pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now + refresh_window() > expires_at || now > expires_at
}

/// Provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// Registry key that selects the factory. The built provider always
    /// reports itself as [`PROVIDER_NAME`].
    #[serde(default)]
    pub name: String,

    /// ACR Enterprise Edition instance id.
    #[serde(default, rename = "instanceID")]
    pub instance_id: Option<String>,
}

impl ProviderConfig {
    /// Decode from a configuration map. Unknown keys are ignored.
    pub fn from_value(value: &serde_json::Value) -> RegistryResult<Self> {
        Self::deserialize(value).map_err(|e| RegistryError::Config {
            message: format!("failed to parse auth provider configuration: {}", e),
        })
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

/// ACR basic-auth provider backed by a token cache.
pub struct AcrBasicProvider {
    provider_name: String,
    instance_id: String,
    issuer: Arc<dyn TokenIssuer>,
    cache: TokenCache,
}

impl std::fmt::Debug for AcrBasicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcrBasicProvider")
            .field("provider_name", &self.provider_name)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

impl AcrBasicProvider {
    /// Create a provider.
    ///
    /// The instance id comes from `config`, falling back to
    /// `ALIBABA_CLOUD_ACR_INSTANCE_ID`.
    pub fn new(config: &ProviderConfig, issuer: Arc<dyn TokenIssuer>) -> RegistryResult<Self> {
        let instance_id = config
            .instance_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| std::env::var(ENV_INSTANCE_ID).ok().filter(|id| !id.is_empty()))
            .ok_or(RegistryError::MissingInstanceId)?;

        Ok(Self {
            provider_name: PROVIDER_NAME.to_string(),
            instance_id,
            issuer,
            cache: TokenCache::new(),
        })
    }

    /// Create a provider from a configuration map.
    pub fn from_value(
        config: &serde_json::Value,
        issuer: Arc<dyn TokenIssuer>,
    ) -> RegistryResult<Self> {
        Self::new(&ProviderConfig::from_value(config)?, issuer)
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Token cache backing this provider.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Drop the cached credential for `artifact`'s registry.
    ///
    /// The next [`provide`](AuthProvider::provide) performs a full fetch.
    pub async fn invalidate(&self, artifact: &str) -> RegistryResult<bool> {
        let host = registry_host(artifact)?;
        let _guard = self.cache.lock_host(&host).await;
        let removed = self.cache.remove(&host).await;
        debug!(host = %host, removed, "invalidated cached registry credential");
        Ok(removed)
    }

    async fn fetch_token(&self, artifact: &str) -> RegistryResult<()> {
        let federation = FederationEnv::from_env()?;

        let identity =
            RegistryIdentity::resolve(artifact).map_err(|e| RegistryError::RegionResolutionFailed {
                reference: artifact.to_string(),
                source: Box::new(e),
            })?;

        let endpoint = regional_endpoint(&identity.region);
        debug!(
            artifact = %artifact,
            registry = %identity.host,
            region = %identity.region,
            "requesting ACR authorization token"
        );

        let request = TokenRequest {
            endpoint: endpoint.clone(),
            region: identity.region.clone(),
            instance_id: self.instance_id.clone(),
            federation,
        };

        let issued = self
            .issuer
            .authorization_token(&request)
            .await
            .map_err(|e| RegistryError::TokenIssuerFailed {
                endpoint: endpoint.clone(),
                source: e.into(),
            })?;

        if issued.authorization_token.is_empty() {
            return Err(RegistryError::InvalidResponse {
                message: format!("empty authorization token from {}", endpoint),
            });
        }

        let expires_at = DateTime::<Utc>::from_timestamp_millis(issued.expire_time).ok_or_else(
            || RegistryError::InvalidResponse {
                message: format!("expire time out of range: {}", issued.expire_time),
            },
        )?;

        self.cache
            .put(
                identity.host.clone(),
                CachedToken {
                    username: issued.temp_username,
                    token: issued.authorization_token,
                    expires_at,
                },
            )
            .await;

        info!(
            registry = %identity.host,
            expires_at = %expires_at,
            "obtained ACR authorization token"
        );

        Ok(())
    }
}

#[async_trait]
impl AuthProvider for AcrBasicProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn enabled(&self) -> bool {
        if self.provider_name.is_empty() {
            error!("basic Alibaba Cloud ACR provider name was empty");
            return false;
        }
        true
    }

    async fn provide(&self, artifact: &str) -> RegistryResult<AuthConfig> {
        debug!(artifact = %artifact, "providing registry credentials");

        if !self.enabled() {
            return Err(RegistryError::NotEnabled {
                provider: self.provider_name.clone(),
            });
        }

        let host = registry_host(artifact)?;
        let _guard = self.cache.lock_host(&host).await;

        let fetch_failed = |e: RegistryError| RegistryError::CredentialFetchFailed {
            artifact: artifact.to_string(),
            source: Box::new(e),
        };

        if !self.cache.exists(&host).await {
            debug!(host = %host, "no cached ACR token");
            self.fetch_token(artifact).await.map_err(fetch_failed)?;
        }

        // Re-checked even right after a cold fetch: a token issued already
        // inside the window is fetched once more.
        let stale = match self.cache.expiry(&host).await {
            Some(expires_at) => needs_refresh(expires_at, Utc::now()),
            None => true,
        };
        if stale {
            self.fetch_token(artifact).await.map_err(fetch_failed)?;
            debug!(artifact = %artifact, "refreshed ACR auth token");
        }

        let token = self.cache.get(&host).await.ok_or_else(|| {
            fetch_failed(RegistryError::InvalidResponse {
                message: format!("no usable token cached for {}", host),
            })
        })?;

        Ok(AuthConfig {
            username: token.username,
            password: token.token,
            expires_on: Some(token.expires_at),
            provider: self.provider_name.clone(),
        })
    }
}

/// Factory registering [`AcrBasicProvider`] in a
/// [`ProviderRegistry`](crate::ProviderRegistry).
pub struct AcrBasicProviderFactory {
    issuer: Arc<dyn TokenIssuer>,
}

impl AcrBasicProviderFactory {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl AuthProviderFactory for AcrBasicProviderFactory {
    fn create(&self, config: &serde_json::Value) -> RegistryResult<Arc<dyn AuthProvider>> {
        let provider = AcrBasicProvider::from_value(config, Arc::clone(&self.issuer))?;
        Ok(Arc::new(provider))
    }
}
