//! Auth provider abstraction and explicit provider registry.
//!
//! Providers are built from configuration maps through a [`ProviderRegistry`]
//! that the application assembles at startup:
//!
//! ```
//! use std::sync::Arc;
//! use registry_auth::{AcrBasicProviderFactory, ProviderRegistry, TokenIssuer};
//!
//! fn registry(issuer: Arc<dyn TokenIssuer>) -> ProviderRegistry {
//!     let mut registry = ProviderRegistry::new();
//!     registry.register(
//!         registry_auth::acr::PROVIDER_NAME,
//!         AcrBasicProviderFactory::new(issuer),
//!     );
//!     registry
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{RegistryError, RegistryResult};

/// Credential handed to the registry transport.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// When the credential stops being valid, if known.
    pub expires_on: Option<DateTime<Utc>>,
    /// Name of the provider that produced the credential.
    pub provider: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("expires_on", &self.expires_on)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Supplies registry credentials for artifacts.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Whether the provider is usable at all.
    fn enabled(&self) -> bool;

    /// Credentials for the registry hosting `artifact`.
    async fn provide(&self, artifact: &str) -> RegistryResult<AuthConfig>;
}

/// Builds a provider from its configuration map.
pub trait AuthProviderFactory: Send + Sync {
    fn create(&self, config: &serde_json::Value) -> RegistryResult<Arc<dyn AuthProvider>>;
}

/// Name → factory map.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Box<dyn AuthProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl AuthProviderFactory + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the provider named by the config's `name` key.
    pub fn create(&self, config: &serde_json::Value) -> RegistryResult<Arc<dyn AuthProvider>> {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RegistryError::Config {
                message: "auth provider configuration has no \"name\"".to_string(),
            })?;

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProvider {
                name: name.to_string(),
            })?;

        factory.create(config)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}
