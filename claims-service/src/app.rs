use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRef, Request},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use common_auth::{PresenceOnlyValidator, SharedTokenValidator};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::ClaimsConfig;
use crate::handlers::{debug_stored_data, health, issue_claims, metrics, store_frontend_data};
use crate::metrics::ClaimsMetrics;
use crate::staging::StagingService;
use crate::store::SharedStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub staging: StagingService,
    pub config: Arc<ClaimsConfig>,
    pub metrics: Arc<ClaimsMetrics>,
    pub token_validator: SharedTokenValidator,
}

impl FromRef<AppState> for SharedTokenValidator {
    fn from_ref(state: &AppState) -> Self {
        state.token_validator.clone()
    }
}

impl AppState {
    /// State with the presence-only bearer check.
    pub fn new(store: SharedStore, config: ClaimsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            staging: StagingService::new(store),
            config: Arc::new(config),
            metrics: Arc::new(ClaimsMetrics::new()?),
            token_validator: Arc::new(PresenceOnlyValidator),
        })
    }

    pub fn with_token_validator(mut self, validator: SharedTokenValidator) -> Self {
        self.token_validator = validator;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/store-frontend-data", post(store_frontend_data))
        .route("/api/custom-claims", post(issue_claims));
    if state.config.debug_routes {
        router = router.route("/debug/stored-data", get(debug_stored_data));
    }

    router
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "Ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "request"
    );
    response
}
