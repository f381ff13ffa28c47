//! Referrers API types and client configuration.

use serde::{Deserialize, Deserializer, Serialize};

/// Response from the referrers extension endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrersResponse {
    /// Subject digest the registry resolved. Empty when omitted, which then
    /// fails the subject check.
    #[serde(default)]
    pub digest: String,

    /// Manifests referring to the subject. `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referrers: Vec<ReferrerDescriptor>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One referrer entry in a [`ReferrersResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrerDescriptor {
    /// Digest of the referring manifest.
    pub digest: String,

    /// Subset of the referring manifest.
    #[serde(default)]
    pub manifest: ReferrerManifest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferrerManifest {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,

    #[serde(rename = "artifactType", default)]
    pub artifact_type: String,
}

/// Size of a referrer, when the registry reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerSize {
    Known(u64),
    Unknown,
}

/// Normalized referrer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerRecord {
    pub digest: String,
    pub media_type: String,
    pub artifact_type: String,
    pub size: ReferrerSize,
}

impl From<ReferrerDescriptor> for ReferrerRecord {
    fn from(desc: ReferrerDescriptor) -> Self {
        Self {
            digest: desc.digest,
            media_type: desc.manifest.media_type,
            artifact_type: desc.manifest.artifact_type,
            // The extension API does not report referrer sizes.
            size: ReferrerSize::Unknown,
        }
    }
}

/// Referrers client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Use `http` instead of `https`.
    #[serde(default)]
    pub plain_http: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            plain_http: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `REGISTRY_AUTH_PLAIN_HTTP` | Talk plain HTTP to registries (dev only) |
    /// | `REGISTRY_AUTH_TIMEOUT` | Request timeout in seconds (default: 30) |
    pub fn from_env() -> Self {
        Self {
            plain_http: std::env::var("REGISTRY_AUTH_PLAIN_HTTP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            timeout_secs: std::env::var("REGISTRY_AUTH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub(crate) fn scheme(&self) -> &'static str {
        if self.plain_http {
            "http"
        } else {
            "https"
        }
    }
}
