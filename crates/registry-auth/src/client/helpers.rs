//! Pure helpers: URL building and response normalization (no HTTP).

use crate::error::{RegistryError, RegistryResult};
use crate::reference::ArtifactReference;
use crate::types::{ReferrerRecord, ReferrersResponse};

/// Build the referrers extension URL for `digest` in `reference`'s repository.
pub(crate) fn referrers_url(scheme: &str, reference: &ArtifactReference, digest: &str) -> String {
    format!(
        "{}://{}/v2/_ext/oci-artifacts/v1/{}/manifests/{}/references",
        scheme, reference.host, reference.repository, digest
    )
}

/// Check the response subject and map its referrers.
pub(crate) fn normalize_referrers(
    response: ReferrersResponse,
    digest: &str,
) -> RegistryResult<Vec<ReferrerRecord>> {
    if response.digest != digest {
        return Err(RegistryError::SubjectMismatch {
            expected: digest.to_string(),
            actual: response.digest,
        });
    }

    Ok(response.referrers.into_iter().map(Into::into).collect())
}
