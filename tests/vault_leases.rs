//! Lease handling of the Vault-backed secret source against a mocked Vault.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;
use valensas_vault_aws::auth::{method::AuthMethod, token::TokenAuth};
use valensas_vault_aws::config::VaultConfig;
use valensas_vault_aws::error::{LeaseError, VaultError};
use valensas_vault_aws::lease::source::SecretSource;
use valensas_vault_aws::lease::Lease;
use valensas_vault_aws::service::VaultService;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "s.test-token";

async fn vault_service(server: &MockServer) -> Arc<VaultService> {
    let config = VaultConfig {
        address: server.uri(),
        default_lease_duration: Duration::from_secs(3600),
        ..Default::default()
    };
    let auth_method: Arc<RwLock<dyn AuthMethod>> = Arc::new(RwLock::new(TokenAuth::new(TOKEN.to_string())));
    VaultService::new(config, auth_method).await.unwrap()
}

#[tokio::test]
async fn request_keeps_the_vault_lease() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/aws/sts/deploy"))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "aws/sts/deploy/b4f3",
            "lease_duration": 900,
            "renewable": true,
            "data": {
                "access_key": "ASIA1",
                "secret_key": "s3cr3t",
                "security_token": "t0k3n"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let secret = vault_service(&server).await.request("aws", "sts/deploy").await.unwrap();

    assert_eq!(secret.lease.lease_id.as_deref(), Some("aws/sts/deploy/b4f3"));
    assert_eq!(secret.lease.lease_duration, Duration::from_secs(900));
    assert!(secret.lease.renewable);
    assert_eq!(secret.data["access_key"], "ASIA1");
}

#[tokio::test]
async fn secret_without_lease_uses_default_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/aws/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "",
            "lease_duration": 0,
            "renewable": false,
            "data": { "access_key": "AKIA1", "secret_key": "s3cr3t" }
        })))
        .mount(&server)
        .await;

    let secret = vault_service(&server).await.request("aws", "creds/readonly").await.unwrap();

    assert_eq!(secret.lease.lease_id, None);
    assert_eq!(secret.lease.lease_duration, Duration::from_secs(3600));
    assert!(!secret.lease.renewable);
}

#[tokio::test]
async fn renew_extends_by_current_duration() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/leases/renew"))
        .and(header("X-Vault-Token", TOKEN))
        .and(body_json(json!({ "lease_id": "aws/sts/deploy/b4f3", "increment": 900 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "aws/sts/deploy/b4f3",
            "lease_duration": 600,
            "renewable": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lease = Lease::new(Some("aws/sts/deploy/b4f3".to_string()), Duration::from_secs(900), true);
    let renewed = vault_service(&server).await.renew(&lease).await.unwrap();

    assert_eq!(renewed.lease_id, lease.lease_id);
    assert_eq!(renewed.lease_duration, Duration::from_secs(600));
}

#[tokio::test]
async fn renew_requires_a_lease_id() {
    let server = MockServer::start().await;
    let lease = Lease::new(None, Duration::from_secs(900), true);

    let result = vault_service(&server).await.renew(&lease).await;

    assert!(matches!(result, Err(LeaseError::Source(_))));
}

#[tokio::test]
async fn revoke_calls_vault_once() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/leases/revoke"))
        .and(body_json(json!({ "lease_id": "aws/creds/readonly/9c1e" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let service = vault_service(&server).await;

    let leased = Lease::new(Some("aws/creds/readonly/9c1e".to_string()), Duration::from_secs(3600), false);
    service.revoke(&leased).await.unwrap();
    service.revoke(&Lease::new(None, Duration::from_secs(3600), false)).await.unwrap();
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/aws/sts/deploy"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let result = vault_service(&server).await.request("aws", "sts/deploy").await;

    match result {
        Err(LeaseError::Vault(VaultError::Status { status, path, message })) => {
            assert_eq!(status, 403);
            assert_eq!(path, "aws/sts/deploy");
            assert_eq!(message, "permission denied");
        }
        other => panic!("unexpected result: {:?}", other.map(|secret| secret.lease)),
    }
}
