//! Integration tests for the externally-routed registration flows and
//! the device-authorization token flow.

use async_trait::async_trait;
use mandata::{
    Client, ClientConfig, GovRegistration, IdentityClient, IdentityConfig, MandataError,
    OperationStatus, PollPolicy, Signer,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "00000000-0000-0000-0000-0000000000a1";
const OP: &str = "00000000-0000-0000-0000-0000000000f1";
const DRAFT: &str = "00000000-0000-0000-0000-0000000000d1";
const DOCUMENT: &str = "00000000-0000-0000-0000-0000000000d2";

fn client_for(server: &MockServer, download_dir: &Path) -> Client {
    Client::with_config(
        "test_api_key",
        ClientConfig {
            base_url: Some(server.uri()),
            download_dir: Some(download_dir.to_path_buf()),
            ..Default::default()
        },
    )
}

fn org_id() -> Uuid {
    Uuid::parse_str(ORG).unwrap()
}

fn fast_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(10))
}

fn registration_params() -> GovRegistration {
    GovRegistration {
        authority_code: "0087".into(),
        registration_number: Some("9988877766".into()),
        payer_inn: "4401165141".into(),
        payer_kpp: "440101001".into(),
        payer_ogrn: "1164401052722".into(),
        payer_snils: Some("170-978-650 12".into()),
        sender_inn: "4401165141".into(),
        sender_kpp: "440101001".into(),
        extern_account_id: "acc-1".into(),
        sender_certificate: "Y2VydA==".into(),
        sender_ip: "203.0.113.7".into(),
    }
}

/// Writes a fixed raw "signature" next to the input file.
struct FakeSigner;

#[async_trait]
impl Signer for FakeSigner {
    async fn sign_detached(&self, path: &Path) -> mandata::Result<PathBuf> {
        let signature = PathBuf::from(format!("{}.sig", path.display()));
        tokio::fs::write(&signature, [0x01, 0x02, 0x03]).await?;
        Ok(signature)
    }
}

#[tokio::test]
async fn test_register_tax_sends_identity_token() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let poa = dir.path().join("poa.xml");
    let sig = dir.path().join("poa.xml.sig");
    tokio::fs::write(&poa, b"<poa/>").await.unwrap();
    tokio::fs::write(&sig, b"signature").await.unwrap();

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fns/registrations"
        )))
        .and(header("X-Identity-Token", "ext-token"))
        .and(header("X-Mandata-Apikey", "test_api_key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": OP,
            "status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fns/registrations/{OP}"
        )))
        .and(header("X-Identity-Token", "ext-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OP,
            "status": "done"
        })))
        .mount(&server)
        .await;

    let operation = client_for(&server, dir.path())
        .gov()
        .register_tax(
            &org_id(),
            "ext-token",
            &registration_params(),
            &poa,
            &sig,
            &fast_policy(),
        )
        .await
        .unwrap();
    assert_eq!(operation.status, OperationStatus::Done);
}

#[tokio::test]
async fn test_register_fund_three_phase_pipeline() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let poa = dir.path().join("poa.xml");
    let sig = dir.path().join("poa.xml.sig");
    tokio::fs::write(&poa, b"<poa/>").await.unwrap();
    tokio::fs::write(&sig, b"signature").await.unwrap();

    // Phase 1: SOAP document generation.
    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/soap-messages"
        )))
        .and(header("X-Identity-Token", "ext-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": OP,
            "status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/soap-messages/{OP}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OP,
            "status": "done",
            "result": { "draftId": DRAFT, "documentId": DOCUMENT }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/soap-messages/{OP}/content"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<soap/>".to_vec()))
        .mount(&server)
        .await;

    // Phase 3: final registration. The fake signer wrote bytes
    // 01 02 03; reversed and base64-encoded that is "AwIB".
    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/registrations"
        )))
        .and(body_partial_json(serde_json::json!({
            "externAccountId": "acc-1",
            "draftId": DRAFT,
            "documentId": DOCUMENT,
            "base64SoapMessageSignature": "AwIB",
            "payerInn": "4401165141"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": OP,
            "status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/registrations/{OP}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OP,
            "status": "done"
        })))
        .mount(&server)
        .await;

    let operation = client_for(&server, dir.path())
        .gov()
        .register_fund(
            &org_id(),
            "ext-token",
            &registration_params(),
            &poa,
            &sig,
            &FakeSigner,
            &fast_policy(),
        )
        .await
        .unwrap();

    assert_eq!(operation.status, OperationStatus::Done);
    // The generated SOAP document was persisted, named after the POA file.
    let soap = dir.path().join("soap_fund_poa.xml");
    assert_eq!(tokio::fs::read(&soap).await.unwrap(), b"<soap/>");
}

#[tokio::test]
async fn test_register_fund_stops_on_soap_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let poa = dir.path().join("poa.xml");
    let sig = dir.path().join("poa.xml.sig");
    tokio::fs::write(&poa, b"<poa/>").await.unwrap();
    tokio::fs::write(&sig, b"signature").await.unwrap();

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/soap-messages"
        )))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": OP,
            "status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/organizations/{ORG}/operations/fss/soap-messages/{OP}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": OP,
            "status": "error",
            "result": { "errors": [{ "code": "rejected" }] }
        })))
        .mount(&server)
        .await;

    let operation = client_for(&server, dir.path())
        .gov()
        .register_fund(
            &org_id(),
            "ext-token",
            &registration_params(),
            &poa,
            &sig,
            &FakeSigner,
            &fast_policy(),
        )
        .await
        .unwrap();

    assert_eq!(operation.status, OperationStatus::Error);
    // The content endpoint and later phases were never reached.
    let later = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            r.url.path().ends_with("/content") || r.url.path().ends_with("/fss/registrations")
        })
        .count();
    assert_eq!(later, 0);
}

#[tokio::test]
async fn test_device_flow_pending_then_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/deviceauthorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "dev-1",
            "user_code": "USER-CODE",
            "verification_uri": "https://identity.example/activate",
            "verification_uri_complete": "https://identity.example/activate?user_code=USER-CODE",
            "expires_in": 600,
            "interval": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "authorization_pending"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let identity = IdentityClient::new(IdentityConfig {
        base_url: Some(server.uri()),
        client_id: "client-1".into(),
        client_secret: "s3cret".into(),
        ..IdentityConfig::default()
    });

    let auth = identity.start_device_authorization().await.unwrap();
    assert_eq!(auth.user_code, "USER-CODE");

    let token = identity
        .wait_for_token(&auth, &PollPolicy::new(Duration::from_millis(10)))
        .await
        .unwrap();
    assert_eq!(token.access_token, "acc");
    assert_eq!(token.refresh_token, "ref");
}

#[tokio::test]
async fn test_device_flow_denied_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "access_denied"
        })))
        .mount(&server)
        .await;

    let identity = IdentityClient::new(IdentityConfig {
        base_url: Some(server.uri()),
        client_id: "client-1".into(),
        client_secret: "s3cret".into(),
        ..IdentityConfig::default()
    });
    let auth = serde_json::from_value::<mandata::DeviceAuthorization>(serde_json::json!({
        "device_code": "dev-1",
        "user_code": "USER-CODE",
        "verification_uri": "https://identity.example/activate"
    }))
    .unwrap();

    let result = identity
        .wait_for_token(&auth, &PollPolicy::new(Duration::from_millis(10)))
        .await;
    assert!(matches!(result, Err(MandataError::Http { status: 400, .. })));
}

#[tokio::test]
async fn test_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "acc-2",
            "refresh_token": "ref-2",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let identity = IdentityClient::new(IdentityConfig {
        base_url: Some(server.uri()),
        client_id: "client-1".into(),
        client_secret: "s3cret".into(),
        ..IdentityConfig::default()
    });

    let token = identity.refresh("ref-1").await.unwrap();
    assert_eq!(token.access_token, "acc-2");
}
