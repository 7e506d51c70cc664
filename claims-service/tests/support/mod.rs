#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use claims_service::{build_router, AppState, ClaimsConfig, MemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub fn memory_app() -> Router {
    memory_app_with(ClaimsConfig::default())
}

pub fn memory_app_with(config: ClaimsConfig) -> Router {
    let state = AppState::new(Arc::new(MemoryStore::new()), config).expect("state");
    build_router(state)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn store_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/store-frontend-data")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn claims_request(bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/custom-claims")
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn token_issuance_event(user: Value, correlation_id: &str) -> Value {
    json!({
        "type": "microsoft.graph.authenticationEvent.tokenIssuanceStart",
        "source": "/tenants/00000000-0000-0000-0000-000000000001/applications/app",
        "data": {
            "@odata.type": "microsoft.graph.onTokenIssuanceStartCalloutData",
            "tenantId": "00000000-0000-0000-0000-000000000001",
            "authenticationEventListenerId": "listener",
            "customAuthenticationExtensionId": "extension",
            "authenticationContext": {
                "correlationId": correlation_id,
                "client": { "ip": "127.0.0.1", "locale": "en-us", "market": "en-us" },
                "protocol": "OAUTH2.0",
                "clientServicePrincipal": { "id": "client-sp", "appId": "client-app" },
                "resourceServicePrincipal": { "id": "resource-sp", "appId": "resource-app" },
                "user": user
            }
        }
    })
}
