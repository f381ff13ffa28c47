//! Integration tests for ReferrersClient.
//!
//! Uses wiremock for HTTP mocking. Tests cover the request path, subject
//! checking, status mapping (401/404/5xx), body decoding, and credential
//! injection.

use std::sync::Arc;

use async_trait::async_trait;
use registry_auth::{
    ArtifactReference, AuthConfig, AuthProvider, ClientConfig, ReferrerRecord, ReferrerSize,
    ReferrersClient, RegistryError, RegistryResult, REGISTRY_USER_AGENT,
};
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBJECT: &str = "sha256:b5b2b2c507a0944348e0303114d8d93aaaa081732b86451d9bce1f432a537bc7";
const SIGNATURE: &str = "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0";

fn test_client() -> ReferrersClient {
    ReferrersClient::new(ClientConfig::default().with_plain_http(true))
        .expect("failed to create client")
}

fn reference(mock_server: &MockServer, repository: &str) -> ArtifactReference {
    ArtifactReference::parse(&format!(
        "{}/{}@{}",
        mock_server.address(),
        repository,
        SUBJECT
    ))
    .expect("valid reference")
}

fn references_path(repository: &str) -> String {
    format!(
        "/v2/_ext/oci-artifacts/v1/{}/manifests/{}/references",
        repository, SUBJECT
    )
}

fn referrers_body(subject: &str) -> serde_json::Value {
    serde_json::json!({
        "digest": subject,
        "referrers": [
            {
                "digest": SIGNATURE,
                "manifest": {
                    "mediaType": "application/vnd.cncf.oras.artifact.manifest.v1+json",
                    "artifactType": "application/vnd.cncf.notary.v2.signature"
                }
            },
            {
                "digest": "sha256:5e9a0b1c",
                "manifest": {
                    "mediaType": "application/vnd.cncf.oras.artifact.manifest.v1+json",
                    "artifactType": "application/spdx+json"
                }
            }
        ]
    })
}

struct StaticProvider;

#[async_trait]
impl AuthProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn provide(&self, _artifact: &str) -> RegistryResult<AuthConfig> {
        Ok(AuthConfig {
            username: "cr_temp_user".to_string(),
            password: "temp-token".to_string(),
            expires_on: None,
            provider: "static".to_string(),
        })
    }
}

struct DisabledProvider;

#[async_trait]
impl AuthProvider for DisabledProvider {
    fn name(&self) -> &str {
        ""
    }

    fn enabled(&self) -> bool {
        false
    }

    async fn provide(&self, _artifact: &str) -> RegistryResult<AuthConfig> {
        Err(RegistryError::NotEnabled {
            provider: String::new(),
        })
    }
}

#[tokio::test]
async fn test_get_referrers_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("net-monitor")))
        .and(header("user-agent", REGISTRY_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(referrers_body(SUBJECT)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let records = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await
        .expect("lookup failed");

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0],
        ReferrerRecord {
            digest: SIGNATURE.to_string(),
            media_type: "application/vnd.cncf.oras.artifact.manifest.v1+json".to_string(),
            artifact_type: "application/vnd.cncf.notary.v2.signature".to_string(),
            size: ReferrerSize::Unknown,
        }
    );
    assert_eq!(records[1].artifact_type, "application/spdx+json");
}

#[tokio::test]
async fn test_get_referrers_nested_repository() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("team/apps/net-monitor")))
        .respond_with(ResponseTemplate::new(200).set_body_json(referrers_body(SUBJECT)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let records = client
        .get_referrers(
            &reference(&mock_server, "team/apps/net-monitor"),
            SUBJECT,
            &[],
            None,
        )
        .await
        .expect("lookup failed");

    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_get_referrers_subject_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("net-monitor")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(referrers_body("sha256:somethingelse")),
        )
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    match result {
        Err(RegistryError::SubjectMismatch { expected, actual }) => {
            assert_eq!(expected, SUBJECT);
            assert_eq!(actual, "sha256:somethingelse");
        }
        other => panic!("expected SubjectMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_referrers_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("net-monitor")))
        .respond_with(ResponseTemplate::new(404).set_body_json(referrers_body(SUBJECT)))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let reference = reference(&mock_server, "net-monitor");
    let result = client.get_referrers(&reference, SUBJECT, &[], None).await;

    match result {
        Err(RegistryError::LookupFailed {
            reference: failed,
            status,
        }) => {
            assert_eq!(failed, reference.original);
            assert_eq!(status, "404 Not Found");
        }
        other => panic!("expected LookupFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_referrers_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    assert!(matches!(result, Err(RegistryError::LookupFailed { status, .. }) if status.starts_with("401")));
}

#[tokio::test]
async fn test_get_referrers_server_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    let err = result.expect_err("expected failure");
    assert!(matches!(err, RegistryError::LookupFailed { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_get_referrers_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    assert!(matches!(result, Err(RegistryError::InvalidResponse { .. })));
}

#[tokio::test]
async fn test_get_referrers_wrong_field_type_names_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "digest": 5 })),
        )
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    match result {
        Err(RegistryError::InvalidResponse { message }) => {
            assert!(message.contains("invalid type"), "message: {}", message);
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_referrers_missing_subject_digest() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "referrers": [] })),
        )
        .mount(&mock_server)
        .await;

    let client = test_client();
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    match result {
        Err(RegistryError::SubjectMismatch { expected, actual }) => {
            assert_eq!(expected, SUBJECT);
            assert_eq!(actual, "");
        }
        other => panic!("expected SubjectMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_referrers_null_referrers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "digest": SUBJECT,
            "referrers": null
        })))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let records = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await
        .expect("lookup failed");

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_get_referrers_entry_without_manifest() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "digest": SUBJECT,
            "referrers": [{ "digest": SIGNATURE }]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let records = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await
        .expect("lookup failed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].digest, SIGNATURE);
    assert_eq!(records[0].artifact_type, "");
}

#[tokio::test]
async fn test_get_referrers_ignores_filters_and_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("net-monitor")))
        .respond_with(ResponseTemplate::new(200).set_body_json(referrers_body(SUBJECT)))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let records = client
        .get_referrers(
            &reference(&mock_server, "net-monitor"),
            SUBJECT,
            &["application/spdx+json".to_string()],
            Some("next-page"),
        )
        .await
        .expect("lookup failed");

    // No server-side or client-side filtering yet.
    assert_eq!(records.len(), 2);

    let requests = mock_server.received_requests().await.expect("recording on");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_get_referrers_with_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(references_path("net-monitor")))
        .and(basic_auth("cr_temp_user", "temp-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(referrers_body(SUBJECT)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client().with_auth_provider(Arc::new(StaticProvider));
    assert!(client.is_authenticated());

    let records = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await
        .expect("lookup failed");
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_get_referrers_credential_failure_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(referrers_body(SUBJECT)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client().with_auth_provider(Arc::new(DisabledProvider));
    let result = client
        .get_referrers(&reference(&mock_server, "net-monitor"), SUBJECT, &[], None)
        .await;

    assert!(matches!(result, Err(RegistryError::NotEnabled { .. })));
}
