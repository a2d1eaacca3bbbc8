use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use casecheck::backend::CaseBackend;
use casecheck::cases::{case_router, CaseDeskService};
use casecheck::intake::bulk::{TEMPLATE, TEMPLATE_FILENAME};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_case_routes<B>(service: Arc<CaseDeskService<B>>) -> axum::Router
where
    B: CaseBackend + 'static,
{
    case_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/cases/bulk/template",
            axum::routing::get(bulk_template_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 once the listener is bound, 503 before.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Sample CSV for bulk send-link intake.
pub(crate) async fn bulk_template_endpoint() -> impl IntoResponse {
    let disposition = format!("attachment; filename=\"{TEMPLATE_FILENAME}\"");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        TEMPLATE,
    )
}
