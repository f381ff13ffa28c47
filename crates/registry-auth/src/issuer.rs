//! Token issuer seam.
//!
//! The actual OIDC role assumption and `GetAuthorizationToken` call live
//! behind [`TokenIssuer`]; the provider only decides *when* to call it and
//! what to do with the result.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{RegistryError, RegistryResult};

/// RAM role assumed through OIDC federation.
pub const ENV_ROLE_ARN: &str = "ALIBABA_CLOUD_ROLE_ARN";
/// OIDC identity provider registered with RAM.
pub const ENV_OIDC_PROVIDER_ARN: &str = "ALIBABA_CLOUD_OIDC_PROVIDER_ARN";
/// Path of the projected service-account token.
pub const ENV_OIDC_TOKEN_FILE: &str = "ALIBABA_CLOUD_OIDC_TOKEN_FILE";

/// Federation settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationEnv {
    pub role_arn: String,
    pub oidc_provider_arn: String,
    pub oidc_token_file: String,
}

impl FederationEnv {
    /// Read the federation variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `ALIBABA_CLOUD_ROLE_ARN` | Role to assume |
    /// | `ALIBABA_CLOUD_OIDC_PROVIDER_ARN` | OIDC provider |
    /// | `ALIBABA_CLOUD_OIDC_TOKEN_FILE` | OIDC token path |
    ///
    /// Unset and empty are treated alike; the error names every missing one.
    pub fn from_env() -> RegistryResult<Self> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let role_arn = read(ENV_ROLE_ARN);
        let oidc_provider_arn = read(ENV_OIDC_PROVIDER_ARN);
        let oidc_token_file = read(ENV_OIDC_TOKEN_FILE);

        match (role_arn, oidc_provider_arn, oidc_token_file) {
            (Some(role_arn), Some(oidc_provider_arn), Some(oidc_token_file)) => Ok(Self {
                role_arn,
                oidc_provider_arn,
                oidc_token_file,
            }),
            (role, provider, file) => {
                let missing: Vec<&str> = [
                    (ENV_ROLE_ARN, role.is_none()),
                    (ENV_OIDC_PROVIDER_ARN, provider.is_none()),
                    (ENV_OIDC_TOKEN_FILE, file.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();

                Err(RegistryError::ConfigurationMissing {
                    message: format!(
                        "required environment variables not set: {}",
                        missing.join(", ")
                    ),
                })
            }
        }
    }
}

/// Request for a registry authorization token.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Regional API endpoint, e.g. `cr.cn-hangzhou.aliyuncs.com`.
    pub endpoint: String,

    /// Region id the endpoint was built from.
    pub region: String,

    /// ACR instance the token is scoped to.
    pub instance_id: String,

    /// Federation identity to exchange.
    pub federation: FederationEnv,
}

/// Token returned by the issuer.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssuedToken {
    /// Temporary username for basic auth.
    pub temp_username: String,

    /// Authorization token (basic auth password).
    pub authorization_token: String,

    /// Expiry as Unix epoch milliseconds.
    pub expire_time: i64,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("temp_username", &self.temp_username)
            .field("authorization_token", &"[REDACTED]")
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

/// Issues registry authorization tokens.
///
/// Implementations perform the cloud identity exchange and the token RPC.
/// One call is one network round trip as far as the provider is concerned.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn authorization_token(&self, request: &TokenRequest) -> anyhow::Result<IssuedToken>;
}
