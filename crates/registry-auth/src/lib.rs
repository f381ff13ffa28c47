//! Container registry credentials and referrer lookups.
//!
//! This crate provides:
//!
//! - Registry identity parsing (ACR instance name and region from a host)
//! - A per-host token cache with lazy, expiry-driven refresh
//! - The Alibaba Cloud ACR basic-auth provider
//! - An explicit provider registry built at startup
//! - A client for the `_ext/oci-artifacts` referrers API
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use registry_auth::{
//!     AcrBasicProvider, ArtifactReference, AuthProvider, ClientConfig, ProviderConfig,
//!     ReferrersClient, TokenIssuer,
//! };
//!
//! # async fn example(issuer: Arc<dyn TokenIssuer>) -> anyhow::Result<()> {
//! let provider = Arc::new(AcrBasicProvider::new(
//!     &ProviderConfig::default().with_instance_id("cri-xxxxxxxx"),
//!     issuer,
//! )?);
//!
//! let reference = ArtifactReference::parse(
//!     "dahu-registry.cn-hangzhou.cr.aliyuncs.com/team/app:v1",
//! )?;
//! let client = ReferrersClient::new(ClientConfig::default())?.with_auth_provider(provider);
//!
//! for referrer in client
//!     .get_referrers(&reference, "sha256:0123abcd", &[], None)
//!     .await?
//! {
//!     println!("{} {}", referrer.digest, referrer.artifact_type);
//! }
//! # Ok(())
//! # }
//! ```

pub mod acr;
pub mod cache;
pub mod client;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod provider;
pub mod reference;
pub mod types;

// Re-export main types
pub use acr::{AcrBasicProvider, AcrBasicProviderFactory, ProviderConfig};
pub use cache::{CachedToken, TokenCache};
pub use client::{ReferrersClient, REGISTRY_USER_AGENT};
pub use error::{RegistryError, RegistryResult};
pub use identity::{registry_host, RegistryIdentity};
pub use issuer::{FederationEnv, IssuedToken, TokenIssuer, TokenRequest};
pub use provider::{AuthConfig, AuthProvider, AuthProviderFactory, ProviderRegistry};
pub use reference::ArtifactReference;
pub use types::{ClientConfig, ReferrerRecord, ReferrerSize, ReferrersResponse};
