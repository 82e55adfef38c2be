use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use ppdb::enrollment::{application_router, ApplicationRepository, EnrollmentService};
use ppdb::error::AppError;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) timestamp: String,
}

pub(crate) fn with_application_routes<R>(service: Arc<EnrollmentService<R>>) -> axum::Router
where
    R: ApplicationRepository + 'static,
{
    application_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Ready once the listener is bound and the store answers a query.
pub(crate) async fn readiness_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Response, AppError> {
    if !state.readiness.load(Ordering::Relaxed) {
        let payload = json!({ "status": "initializing" });
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response());
    }

    let counts = state.store.status_counts()?;
    let payload = json!({ "status": "ready", "applications": counts.total });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
