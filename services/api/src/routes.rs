use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use consultancy::admissions::{class_router, student_router, AdmissionsState};
use consultancy::attendance::attendance_router;
use consultancy::ledger::ledger_router;
use consultancy::profile::ProfileRenderer;
use consultancy::reporting::reporting_router;
use consultancy::storage::{upload_router, FileStore};
use serde_json::json;
use std::sync::Arc;

/// Every entity router plus uploads, merged into one application.
pub(crate) fn api_router(
    services: &Services,
    files: Arc<dyn FileStore>,
    renderer: Arc<dyn ProfileRenderer>,
) -> Router {
    let admissions = AdmissionsState {
        service: services.admissions.clone(),
        files: files.clone(),
        renderer,
    };

    Router::new()
        .merge(student_router(admissions))
        .merge(class_router(services.admissions.clone()))
        .merge(reporting_router(services.reporting.clone()))
        .merge(ledger_router(services.payments.clone(), "/api/payments"))
        .merge(ledger_router(
            services.custom_incomes.clone(),
            "/api/custom-income",
        ))
        .merge(attendance_router(services.attendance.clone()))
        .merge(upload_router(files))
}

pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
