//! Discovery, consent and token exchange against a mocked bank.

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xs2a_gateway::client::BankClient;
use xs2a_gateway::config::Config;
use xs2a_gateway::error::{AisError, ClientError};
use xs2a_gateway::oauth::consent::start_consent;
use xs2a_gateway::oauth::discovery::discover;
use xs2a_gateway::oauth::token::{build_authorization_link, exchange_token};
use xs2a_gateway::oauth::{Endpoints, SessionStore, Tokens, pkce};

fn setup(mock_server: &MockServer) -> (Config, BankClient) {
    let config = Config::for_testing(&mock_server.uri());
    let client = BankClient::new(&config).unwrap();
    (config, client)
}

async fn mount_discovery(mock_server: &MockServer, document: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(mock_server)
        .await;
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_discovery_decodes_endpoints() {
    let mock_server = MockServer::start().await;
    mount_discovery(
        &mock_server,
        json!({
            "issuer": "https://bank",
            "authorization_endpoint": "https://bank/auth",
            "token_endpoint": "https://bank/token",
            "jwks_uri": "https://bank/jwks"
        }),
    )
    .await;
    let (config, client) = setup(&mock_server);

    let endpoints = discover(&client, &config.well_known_url).await.unwrap();
    assert_eq!(endpoints.authorization, "https://bank/auth");
    assert_eq!(endpoints.token, "https://bank/token");
    assert_eq!(endpoints.jwks_uri.as_deref(), Some("https://bank/jwks"));
}

#[tokio::test]
async fn test_discovery_rejects_incomplete_document() {
    let mock_server = MockServer::start().await;
    mount_discovery(&mock_server, json!({"authorization_endpoint": "https://bank/auth"})).await;
    let (config, client) = setup(&mock_server);

    let err = discover(&client, &config.well_known_url).await.unwrap_err();
    assert!(matches!(err, AisError::Upstream(ClientError::Parse(_))));
}

#[tokio::test]
async fn test_discovery_rejects_empty_endpoints() {
    let mock_server = MockServer::start().await;
    mount_discovery(&mock_server, json!({"authorization_endpoint": "", "token_endpoint": ""}))
        .await;
    let (config, client) = setup(&mock_server);

    let err = discover(&client, &config.well_known_url).await.unwrap_err();
    assert!(matches!(err, AisError::Configuration(_)));
}

#[tokio::test]
async fn test_discovery_not_found() {
    let mock_server = MockServer::start().await;
    let (config, client) = setup(&mock_server);

    let err = discover(&client, &config.well_known_url).await.unwrap_err();
    assert!(matches!(err, AisError::Upstream(ClientError::NotFound { .. })));
}

// =============================================================================
// Consent
// =============================================================================

#[tokio::test]
async fn test_start_consent_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xs2a/v1/consents"))
        .and(header("Content-Type", "application/json"))
        .and(header("TPP-Redirect-Preferred", "true"))
        .and(header_exists("X-Request-ID"))
        .and(header_exists("TPP-Redirect-URI"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"consentId": "C1", "consentStatus": "received"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    let (config, client) = setup(&mock_server);

    let consent = start_consent(&client, &config).await.unwrap();
    assert_eq!(consent.id, "C1");
    assert_eq!(consent.status, "received");

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["access"]["balances"][0]["iban"], config.iban.as_str());
    assert_eq!(body["access"]["transactions"][0]["iban"], config.iban.as_str());
    assert_eq!(body["frequencyPerDay"], 4);
    assert_eq!(body["recurringIndicator"], true);
    assert_eq!(body["combinedServiceIndicator"], false);
    assert_eq!(body["validUntil"].as_str().unwrap().len(), "2026-11-19".len());

    let request_id = requests[0].headers.get("X-Request-ID").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
    let redirect = requests[0].headers.get("TPP-Redirect-URI").unwrap().to_str().unwrap();
    assert_eq!(redirect, config.tpp_redirect_uri);
}

#[tokio::test]
async fn test_start_consent_upstream_error_is_recoverable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xs2a/v1/consents"))
        .respond_with(ResponseTemplate::new(400).set_body_string("FORMAT_ERROR: iban"))
        .mount(&mock_server)
        .await;
    let (config, client) = setup(&mock_server);

    let err = start_consent(&client, &config).await.unwrap_err();
    assert!(matches!(err, AisError::Upstream(ClientError::BadRequest { .. })));
    assert!(err.to_user_message().contains("FORMAT_ERROR"));
}

#[tokio::test]
async fn test_start_consent_malformed_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xs2a/v1/consents"))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .mount(&mock_server)
        .await;
    let (config, client) = setup(&mock_server);

    let err = start_consent(&client, &config).await.unwrap_err();
    assert!(matches!(err, AisError::Upstream(ClientError::Parse(_))));
}

// =============================================================================
// Consent + session + authorization link
// =============================================================================

#[tokio::test]
async fn test_consent_session_and_link() {
    let mock_server = MockServer::start().await;
    mount_discovery(
        &mock_server,
        json!({
            "authorization_endpoint": "https://bank/auth",
            "token_endpoint": "https://bank/token"
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/xs2a/v1/consents"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"consentId": "C1", "consentStatus": "received"})),
        )
        .mount(&mock_server)
        .await;
    let (config, client) = setup(&mock_server);

    let endpoints = discover(&client, &config.well_known_url).await.unwrap();
    let consent = start_consent(&client, &config).await.unwrap();

    let store = SessionStore::new();
    let session_token = store.create(consent, "V".into()).await;
    assert_eq!(store.get(&session_token).await.unwrap().consent.id, "C1");

    let url = build_authorization_link(&endpoints, "openxs2a", "C1", "S1", "V").unwrap();
    assert_eq!(url.host_str(), Some("bank"));
    assert_eq!(url.path(), "/auth");

    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(query["state"], "S1");
    assert_eq!(query["scope"], "AIS: C1");
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(pkce::verify_s256("V", &query["code_challenge"]));
}

// =============================================================================
// Token exchange
// =============================================================================

fn mock_endpoints(mock_server: &MockServer) -> Endpoints {
    Endpoints {
        authorization: format!("{}/auth", mock_server.uri()),
        token: format!("{}/token", mock_server.uri()),
        jwks_uri: None,
    }
}

#[tokio::test]
async fn test_exchange_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token_type": "Bearer", "access_token": "AT1"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    let (_, client) = setup(&mock_server);

    let tokens = exchange_token(&client, &mock_endpoints(&mock_server), "openxs2a", "code123", "V")
        .await
        .unwrap();
    assert_eq!(
        tokens,
        Tokens {
            token_type: "Bearer".into(),
            access_token: "AT1".into(),
            refresh_token: None,
            expires_in: None,
            scope: None,
        }
    );

    let requests = mock_server.received_requests().await.unwrap();
    let form: HashMap<String, String> = serde_urlencoded::from_bytes(&requests[0].body).unwrap();
    assert_eq!(form["code"], "code123");
    assert_eq!(form["client_id"], "openxs2a");
    assert_eq!(form["code_verifier"], "V");
    assert_eq!(form["grant_type"], "authorization_code");
}

#[tokio::test]
async fn test_exchange_token_rejected_code() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "invalid_grant", "error_description": "code used"})),
        )
        .mount(&mock_server)
        .await;
    let (_, client) = setup(&mock_server);

    let err = exchange_token(&client, &mock_endpoints(&mock_server), "openxs2a", "stale", "V")
        .await
        .unwrap_err();
    assert!(matches!(err, AisError::Upstream(ClientError::BadRequest { .. })));
    assert!(err.to_user_message().contains("invalid_grant"));
}
