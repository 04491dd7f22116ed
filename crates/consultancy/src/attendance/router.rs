use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::AttendanceMark;
use super::repository::AttendanceRepository;
use super::service::{AttendanceError, AttendanceService};
use crate::admissions::{ClassRepository, StudentRepository};
use crate::error::{error_response, repository_status};

impl IntoResponse for AttendanceError {
    fn into_response(self) -> Response {
        match self {
            AttendanceError::Validation(err) => err.into_response(),
            AttendanceError::NotFound { .. } => {
                error_response(StatusCode::NOT_FOUND, self.to_string())
            }
            AttendanceError::Repository(err) => {
                error_response(repository_status(&err), err.to_string())
            }
        }
    }
}

pub fn attendance_router<A, S, C>(service: Arc<AttendanceService<A, S, C>>) -> Router
where
    A: AttendanceRepository + 'static,
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    Router::new()
        .route("/api/attendance", post(mark_handler::<A, S, C>))
        .route("/api/attendance/records", get(records_handler::<A, S, C>))
        .with_state(service)
}

pub(crate) async fn mark_handler<A, S, C>(
    State(service): State<Arc<AttendanceService<A, S, C>>>,
    Json(mark): Json<AttendanceMark>,
) -> Response
where
    A: AttendanceRepository + 'static,
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.mark(mark) {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({ "message": "Attendance saved", "attendance": record })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordsQuery {
    #[serde(default)]
    class_id: Option<String>,
    #[serde(default)]
    ad_month: Option<String>,
}

pub(crate) async fn records_handler<A, S, C>(
    State(service): State<Arc<AttendanceService<A, S, C>>>,
    Query(query): Query<RecordsQuery>,
) -> Response
where
    A: AttendanceRepository + 'static,
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.month_sheet(query.class_id.as_deref(), query.ad_month.as_deref()) {
        Ok(sheet) => (StatusCode::OK, Json(sheet)).into_response(),
        Err(err) => err.into_response(),
    }
}
