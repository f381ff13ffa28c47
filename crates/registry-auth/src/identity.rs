//! Registry identity resolution.
//!
//! Turns an artifact reference such as
//! `dahu-registry-vpc.cn-hangzhou.cr.aliyuncs.com/foo:latest` into the
//! registry host plus the ACR instance name and region encoded in it:
//!
//! ```text
//! [<instance>-]registry[-intl][-vpc][-internal][.distributed].<region>.[cr.]aliyuncs.com
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RegistryError, RegistryResult};

/// Domain suffix every ACR host carries.
pub const ACR_DOMAIN_SUFFIX: &str = ".aliyuncs.com";

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<instance>[^.\s]+)-)?registry(?:-intl)?(?:-vpc)?(?:-internal)?(?:\.distributed)?\.(?P<region>[^.]+-[^.]+)\.(?:cr\.)?aliyuncs\.com",
        )
        .expect("ACR domain pattern is valid")
    })
}

/// Routing metadata parsed from an ACR registry host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryIdentity {
    /// Registry host the identity was parsed from.
    pub host: String,

    /// Enterprise-edition instance name (`dahu` in `dahu-registry...`).
    pub instance_name: Option<String>,

    /// Region id, e.g. `cn-hangzhou`.
    pub region: String,
}

impl RegistryIdentity {
    /// Parse a registry host (or full artifact reference) into its identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_auth::RegistryIdentity;
    ///
    /// let id = RegistryIdentity::resolve("dahu-registry-vpc.cn-hangzhou.cr.aliyuncs.com").unwrap();
    /// assert_eq!(id.instance_name.as_deref(), Some("dahu"));
    /// assert_eq!(id.region, "cn-hangzhou");
    ///
    /// assert!(RegistryIdentity::resolve("registry-vpc.cr.aliyuncs.com").is_err());
    /// ```
    pub fn resolve(reference: &str) -> RegistryResult<Self> {
        let host = registry_host(reference)?;
        let unrecognized = || RegistryError::UnrecognizedFormat {
            reference: host.clone(),
        };

        if !host.ends_with(ACR_DOMAIN_SUFFIX) {
            return Err(unrecognized());
        }

        let captures = domain_pattern().captures(&host).ok_or_else(unrecognized)?;

        let region = captures
            .name("region")
            .map(|m| m.as_str())
            .filter(|r| !r.is_empty())
            .ok_or_else(unrecognized)?
            .to_string();

        let instance_name = captures
            .name("instance")
            .map(|m| m.as_str())
            .filter(|n| !n.is_empty())
            .map(String::from);

        Ok(Self {
            host,
            instance_name,
            region,
        })
    }
}

/// Extract the registry host from an artifact reference.
///
/// `host/repo:tag` yields `host`; a bare host is returned as-is, minus any
/// `@digest`. References with a URL scheme are rejected.
pub fn registry_host(reference: &str) -> RegistryResult<String> {
    let reference = reference.trim();

    if reference.is_empty() {
        return Err(RegistryError::InvalidReference {
            reference: reference.to_string(),
            reason: "empty reference".to_string(),
        });
    }

    if reference.contains("://") {
        return Err(RegistryError::InvalidReference {
            reference: reference.to_string(),
            reason: "reference must not contain a URL scheme".to_string(),
        });
    }

    let host = match reference.split_once('/') {
        Some((host, _)) => host,
        None => reference.split('@').next().unwrap_or(reference),
    };

    if host.is_empty() {
        return Err(RegistryError::InvalidReference {
            reference: reference.to_string(),
            reason: "missing registry host".to_string(),
        });
    }

    Ok(host.to_string())
}
