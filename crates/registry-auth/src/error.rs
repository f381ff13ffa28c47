//! Error types for credential providers and the referrers client.

/// Boxed cause attached to wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Required federation environment is absent.
    #[error("configuration missing: {message}")]
    ConfigurationMissing { message: String },

    /// Neither the provider config nor the environment names an ACR instance.
    #[error(
        "no instance ID provided and {} environment variable is empty",
        crate::acr::ENV_INSTANCE_ID
    )]
    MissingInstanceId,

    /// Registry host does not look like an ACR endpoint.
    #[error("unrecognized registry format: {reference}")]
    UnrecognizedFormat { reference: String },

    /// Region could not be derived while fetching a token.
    #[error("failed to get region from {reference}")]
    RegionResolutionFailed {
        reference: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// The token issuer rejected or failed the request.
    #[error("authorization token request to {endpoint} failed")]
    TokenIssuerFailed {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    /// Fetching or refreshing credentials for an artifact failed.
    #[error("could not get registry credentials for {artifact}")]
    CredentialFetchFailed {
        artifact: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// Provider is misconfigured and must not be used.
    #[error("auth provider {provider:?} is not properly enabled")]
    NotEnabled { provider: String },

    /// Invalid artifact reference format.
    #[error("invalid reference: {reference} - {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Registry answered a lookup with a non-200 status.
    #[error("{reference}: {status}")]
    LookupFailed { reference: String, status: String },

    /// Registry returned referrers for a different subject.
    #[error("subject manifest mismatch. expected: {expected:?} got {actual:?}")]
    SubjectMismatch { expected: String, actual: String },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Invalid response from a registry or token issuer.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration decoding error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// No factory registered under the requested provider name.
    #[error("unknown auth provider: {name}")]
    UnknownProvider { name: String },
}

impl RegistryError {
    /// Whether a caller may reasonably retry the operation.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::TokenIssuerFailed { .. } => true,
            Self::LookupFailed { status, .. } => {
                status.starts_with('5') || status.starts_with("429")
            }
            Self::CredentialFetchFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
