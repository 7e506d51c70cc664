use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use common_auth::BearerToken;
use common_http_errors::{ApiError, ApiJson, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::claims::{compose_claims, ClaimsResponse};
use crate::events::TokenIssuanceEvent;
use crate::staging::ConsumeOutcome;
use crate::store::{StoreKind, StoreStats};

// Store request/response types
#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    pub user_id: String,
    pub business_unit: String,
    pub device_info: String,
    #[serde(default)]
    pub custom_data: Option<String>,
    /// Client clock at submission, epoch seconds. Informational only.
    pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: String,
    pub expires_in: u64,
    pub storage_type: StoreKind,
}

pub async fn store_frontend_data(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StoreRequest>,
) -> ApiResult<Json<StoreResponse>> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("invalid_user_id", "user_id must not be blank"));
    }
    debug!(user_id = %req.user_id, client_timestamp = req.timestamp, "Staging frontend data");

    let stored = state
        .staging
        .stage(
            &req.user_id,
            &req.business_unit,
            &req.device_info,
            req.custom_data.as_deref(),
        )
        .await;
    state.metrics.record_stage(stored);
    if !stored {
        return Err(ApiError::internal("Failed to store data"));
    }

    info!(user_id = %req.user_id, storage_type = %state.staging.kind(), "Stored frontend data");
    Ok(Json(StoreResponse {
        success: true,
        message: "Data stored successfully",
        user_id: req.user_id,
        expires_in: state.staging.ttl().as_secs(),
        storage_type: state.staging.kind(),
    }))
}

/// Custom claims callback invoked by the identity provider during token issuance.
pub async fn issue_claims(
    State(state): State<AppState>,
    _bearer: BearerToken,
    ApiJson(event): ApiJson<TokenIssuanceEvent>,
) -> ApiResult<Json<ClaimsResponse>> {
    let context = event.context();
    let user_id = context.user.staging_key().ok_or_else(|| {
        ApiError::bad_request(
            "missing_user",
            "authenticationContext.user has neither userPrincipalName nor id",
        )
    })?;
    info!(user_id, correlation_id = %context.correlation_id, "Processing claims");
    debug!(?event, "Token issuance event");

    let outcome = state.staging.consume(user_id).await;
    match &outcome {
        ConsumeOutcome::Staged { data_age_seconds, .. } => {
            info!(user_id, data_age_seconds, "Used and cleared staged data");
        }
        ConsumeOutcome::Missing => {
            warn!(user_id, "No staged data found; issuing default claims");
        }
    }

    let claims = compose_claims(
        &context.correlation_id,
        &outcome,
        state.staging.kind(),
        Utc::now(),
    );
    state.metrics.record_issued(claims.data_source);
    debug!(?claims, "Returning claims");
    Ok(Json(ClaimsResponse::provide(claims)))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: String,
    pub storage: StoreStats,
    pub azure_config: AzureConfigStatus,
}

#[derive(Debug, Serialize)]
pub struct AzureConfigStatus {
    pub tenant_id: String,
    pub client_id_configured: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = state.staging.store().stats().await;
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        environment: state.config.environment.clone(),
        storage,
        azure_config: AzureConfigStatus {
            tenant_id: state.config.azure_tenant_id.clone(),
            client_id_configured: state.config.client_id_configured(),
        },
    })
}

#[derive(Debug, Serialize)]
pub struct StoredDataDump {
    pub storage_type: StoreKind,
    pub stored_data: Map<String, Value>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_expired: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_info: Option<StoreStats>,
}

/// Lists every staged entry. Enumerates the whole key space on Redis, so it is
/// only routed when debug routes are enabled.
pub async fn debug_stored_data(State(state): State<AppState>) -> ApiResult<Json<StoredDataDump>> {
    let store = state.staging.store();
    let snapshot = store.snapshot().await.map_err(|err| {
        warn!(error = %err, "Failed to list stored data");
        ApiError::internal(err)
    })?;

    let stored_data: Map<String, Value> = snapshot
        .entries
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (key, value)
        })
        .collect();

    let kind = store.kind();
    let (cleaned_expired, redis_info) = match kind {
        StoreKind::Memory => (Some(snapshot.cleaned_expired), None),
        StoreKind::Redis => (None, Some(store.stats().await)),
    };

    Ok(Json(StoredDataDump {
        storage_type: kind,
        count: stored_data.len(),
        stored_data,
        cleaned_expired,
        redis_info,
    }))
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<Response> {
    state.metrics.render().map_err(ApiError::internal)
}
