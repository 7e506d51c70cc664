mod support;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use claims_service::{build_router, AppState, ClaimsConfig, MemoryStore};
use common_auth::{AuthError, AuthResult, TokenValidator};
use serde_json::json;
use support::{claims_request, memory_app, send, store_request, token_issuance_event};

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let app = memory_app();
    let event = token_issuance_event(json!({"id": "oid-1"}), "corr-1");
    let (status, body) = send(&app, claims_request(None, event)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_HEADER");
    assert!(body["detail"].is_string());
}

struct RejectAll;

#[async_trait]
impl TokenValidator for RejectAll {
    async fn validate(&self, _token: &str) -> AuthResult<()> {
        Err(AuthError::Rejected("unknown signing key".into()))
    }
}

#[tokio::test]
async fn substituted_validator_can_reject() {
    let state = AppState::new(Arc::new(MemoryStore::new()), ClaimsConfig::default())
        .expect("state")
        .with_token_validator(Arc::new(RejectAll));
    let app = build_router(state);
    let event = token_issuance_event(json!({"id": "oid-1"}), "corr-1");
    let (status, body) = send(&app, claims_request(Some("token"), event)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_TOKEN");
}

#[tokio::test]
async fn event_without_authentication_context_is_bad_request() {
    let app = memory_app();
    let (status, body) = send(
        &app,
        claims_request(Some("token"), json!({"type": "x", "data": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
    assert!(body["detail"].as_str().unwrap().contains("authenticationContext"));
}

#[tokio::test]
async fn event_without_user_identifier_is_bad_request() {
    let app = memory_app();
    let event = token_issuance_event(json!({"displayName": "anon"}), "corr-1");
    let (status, body) = send(&app, claims_request(Some("token"), event)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_user");
}

#[tokio::test]
async fn store_missing_fields_is_bad_request() {
    let app = memory_app();
    let (status, body) = send(&app, store_request(json!({"user_id": "u1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn store_blank_user_is_bad_request() {
    let app = memory_app();
    let (status, body) = send(
        &app,
        store_request(json!({
            "user_id": "  ",
            "business_unit": "Finance",
            "device_info": "iPhone15",
            "timestamp": 1.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_user_id");
}

fn raw_claims_request(content_type: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/custom-claims")
        .header("content-type", content_type)
        .header("authorization", "Bearer token")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn malformed_json_event_is_bad_request() {
    let app = memory_app();
    let (status, body) = send(&app, raw_claims_request("application/json", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn non_json_content_type_is_bad_request() {
    let app = memory_app();
    let (status, body) = send(&app, raw_claims_request("text/plain", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}
