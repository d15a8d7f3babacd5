//! Router and handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use dealsync_core::DealSubmission;
use dealsync_crm::CrmGateway;
use dealsync_reconcile::pipeline;

use crate::protocol::{ErrorResponse, HealthResponse};

/// Shared handler state. The gateway is immutable and shared by every
/// request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn CrmGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn CrmGateway>) -> Self {
        Self { gateway }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1", post(submit_deal))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// `POST /api/v1`: validate, reconcile on a blocking worker, answer.
async fn submit_deal(
    State(state): State<AppState>,
    payload: Result<Json<DealSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!(error = %rejection.body_text(), "rejected invalid submission");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse::validation(rejection.body_text())),
            )
                .into_response();
        }
    };

    let gateway = state.gateway.clone();
    let joined =
        tokio::task::spawn_blocking(move || pipeline::submit(gateway.as_ref(), &submission)).await;

    match joined {
        Ok(Ok(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "CRM lookup failed");
            (StatusCode::BAD_GATEWAY, Json(ErrorResponse::upstream(&err))).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "submission worker failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("submission worker failed")),
            )
                .into_response()
        }
    }
}
