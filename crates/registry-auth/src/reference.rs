//! Artifact reference parsing.
//!
//! Supported forms:
//! - `host/repo` → implicit tag
//! - `host/ns/repo:tag` → tagged
//! - `host/repo@sha256:abc...` → pinned by digest
//! - `host:5000/repo:tag@sha256:abc...` → both

use crate::error::{RegistryError, RegistryResult};

/// A parsed artifact reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    /// The reference exactly as supplied.
    pub original: String,

    /// Registry host, including any port.
    pub host: String,

    /// Repository path below the host. May contain further `/` segments.
    pub repository: String,

    pub tag: Option<String>,

    /// Manifest digest (`algorithm:encoded`).
    pub digest: Option<String>,
}

impl ArtifactReference {
    /// Parse an artifact reference string.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_auth::ArtifactReference;
    ///
    /// let r = ArtifactReference::parse("myregistry.io/team/app:v1@sha256:abc123").unwrap();
    /// assert_eq!(r.host, "myregistry.io");
    /// assert_eq!(r.repository, "team/app");
    /// assert_eq!(r.tag.as_deref(), Some("v1"));
    /// assert_eq!(r.digest.as_deref(), Some("sha256:abc123"));
    /// ```
    pub fn parse(reference: &str) -> RegistryResult<Self> {
        let original = reference.trim();
        let invalid = |reason: &str| RegistryError::InvalidReference {
            reference: original.to_string(),
            reason: reason.to_string(),
        };

        if original.is_empty() {
            return Err(invalid("empty reference"));
        }
        if original.contains("://") {
            return Err(invalid("reference must not contain a URL scheme"));
        }

        let (name, digest) = match original.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest).map_err(|reason| invalid(&reason))?;
                (name, Some(digest.to_string()))
            }
            None => (original, None),
        };

        let (host, path) = name
            .split_once('/')
            .ok_or_else(|| invalid("reference must include a registry host and repository"))?;

        if host.is_empty() {
            return Err(invalid("missing registry host"));
        }

        // A ':' after the last '/' separates the tag; one before it is a port.
        let (repository, tag) = match path.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo, Some(tag.to_string())),
            _ => (path, None),
        };

        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(invalid("repository path has an empty segment"));
        }
        if tag.as_deref() == Some("") {
            return Err(invalid("tag cannot be empty"));
        }

        Ok(Self {
            original: original.to_string(),
            host: host.to_string(),
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// `host/repository`, without tag or digest.
    pub fn path(&self) -> String {
        format!("{}/{}", self.host, self.repository)
    }
}

impl std::fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl std::str::FromStr for ArtifactReference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check `algorithm:encoded` shape.
pub(crate) fn validate_digest(digest: &str) -> Result<(), String> {
    let (algorithm, encoded) = digest
        .split_once(':')
        .ok_or_else(|| format!("digest {:?} must be algorithm:encoded", digest))?;

    if algorithm.is_empty()
        || !algorithm
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
    {
        return Err(format!("invalid digest algorithm in {:?}", digest));
    }

    if encoded.is_empty()
        || !encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "=_-".contains(c))
    {
        return Err(format!("invalid digest encoding in {:?}", digest));
    }

    Ok(())
}
