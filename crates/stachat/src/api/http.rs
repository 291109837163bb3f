use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::api::{
    auth::SignatureVerifier,
    error::GatewayError,
    handler::RequestHandler,
    models::{HealthStatus, WebhookResponse, WelcomeResponse},
};

#[derive(Clone)]
pub struct GatewayState {
    pub handler: RequestHandler,
    pub verifier: Arc<SignatureVerifier>,
    pub started_at: DateTime<Utc>,
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to STACHAT!".to_string(),
    })
}

async fn health(State(state): State<GatewayState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// The signature covers the raw bytes, so the body is verified before it is
/// parsed.
async fn webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, GatewayError> {
    if let Err(err) = state.verifier.verify(&headers, &body) {
        warn!(error = %err, "Rejected webhook request");
        return Err(err.into());
    }
    let response = state.handler.process_body(&body).await?;
    Ok(Json(response))
}
