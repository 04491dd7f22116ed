use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use super::service::{ReportingError, ReportingService};
use super::RateOverrides;
use crate::admissions::{ClassRepository, StudentRepository};
use crate::dates::RangeQuery;
use crate::error::{error_response, repository_status};
use crate::ledger::LedgerRepository;

impl IntoResponse for ReportingError {
    fn into_response(self) -> Response {
        match self {
            ReportingError::Validation(err) => err.into_response(),
            ReportingError::Overflow(err) => {
                warn!(error = %err, "report total out of range");
                error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ReportingError::Repository(err) => {
                error_response(repository_status(&err), err.to_string())
            }
            ReportingError::Export(err) => {
                warn!(error = %err, "roster export failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

/// `/api/students/summary`, `/calculation`, and `/export`.
pub fn reporting_router<S, C, L>(service: Arc<ReportingService<S, C, L>>) -> Router
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
    L: LedgerRepository + 'static,
{
    Router::new()
        .route("/api/students/summary", get(summary_handler::<S, C, L>))
        .route("/api/students/calculation", get(calculation_handler::<S, C, L>))
        .route("/api/students/export", get(export_handler::<S, C, L>))
        .with_state(service)
}

/// Date window plus optional rate overrides, all as query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryQuery {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    new_student_income: Option<i64>,
    #[serde(default)]
    coe_applied_income: Option<i64>,
    #[serde(default)]
    coe_received_income: Option<i64>,
}

impl SummaryQuery {
    fn overrides(&self) -> RateOverrides {
        RateOverrides {
            new_student_income: self.new_student_income,
            coe_applied_income: self.coe_applied_income,
            coe_received_income: self.coe_received_income,
        }
    }
}

pub(crate) async fn summary_handler<S, C, L>(
    State(service): State<Arc<ReportingService<S, C, L>>>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
    L: LedgerRepository + 'static,
{
    let overrides = query.overrides();
    let range = match (RangeQuery {
        from: query.from,
        to: query.to,
    })
    .into_range()
    {
        Ok(range) => range,
        Err(err) => return err.into_response(),
    };

    match service.summary(&range, &overrides) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn calculation_handler<S, C, L>(
    State(service): State<Arc<ReportingService<S, C, L>>>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
    L: LedgerRepository + 'static,
{
    match service.calculation(&query.overrides()) {
        Ok(calculation) => (StatusCode::OK, Json(calculation)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn export_handler<S, C, L>(
    State(service): State<Arc<ReportingService<S, C, L>>>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
    L: LedgerRepository + 'static,
{
    match service.export() {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=students.csv".to_string(),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::{AdmissionsService, EnumPolicy};
    use crate::ledger::{LedgerInput, LedgerKind, LedgerService};
    use crate::reporting::IncomeRates;
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn seeded_router() -> Router {
        let store = InMemoryStore::new();
        let shared = Arc::new(store.clone());
        let admissions =
            AdmissionsService::new(shared.clone(), shared.clone(), EnumPolicy::Substitute);
        admissions
            .create(json!({
                "firstName": "Asha",
                "eligibleForIncomeBonus": true,
                "COEStatus": "Received",
            }))
            .expect("student");
        admissions
            .create(json!({ "firstName": "Bina", "COEStatus": "Applied" }))
            .expect("student");

        let payments = Arc::new(store.payments());
        let ledger = LedgerService::new(payments.clone(), LedgerKind::Payment);
        ledger
            .record(
                LedgerInput {
                    amount: Some(1000),
                    date: NaiveDate::from_ymd_opt(2025, 7, 4),
                    remark: None,
                },
                NaiveDate::from_ymd_opt(2025, 7, 4).expect("date"),
            )
            .expect("payment");

        let reporting = ReportingService::new(
            shared.clone(),
            shared,
            payments,
            Arc::new(store.custom_incomes()),
            IncomeRates::default(),
        );
        reporting_router(Arc::new(reporting))
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn summary_applies_range_and_overrides() {
        let router = seeded_router();

        let (status, summary) =
            get_json(&router, "/api/students/summary?from=2025-07-01&to=2025-07-31").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["totalStudents"], 2);
        assert_eq!(summary["totalIncome"], 22000);
        assert_eq!(summary["totalPaymentsReceived"], 1000);
        assert_eq!(summary["paymentDue"], 21000);
        assert_eq!(summary["appliedCoe"], 1);

        let (_, overridden) =
            get_json(&router, "/api/students/summary?coeReceivedIncome=0&from=2025-08-01").await;
        assert_eq!(overridden["totalIncome"], 12000);
        assert_eq!(overridden["totalPaymentsReceived"], 0);

        let (status, _) = get_json(&router, "/api/students/summary?from=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn calculation_lists_each_student() {
        let router = seeded_router();
        let (status, calculation) =
            get_json(&router, "/api/students/calculation?newStudentIncome=3000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calculation["students"].as_array().map(Vec::len), Some(2));
        assert_eq!(calculation["totalIncome"], 23000);
        assert_eq!(calculation["rates"]["newStudent"], 3000);
    }

    #[tokio::test]
    async fn export_is_csv_attachment() {
        let router = seeded_router();
        let response = router
            .oneshot(
                Request::get("/api/students/export")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("type"),
            "text/csv; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test]
    async fn bad_rates_and_oversized_totals_are_client_errors() {
        let router = seeded_router();

        let (status, body) =
            get_json(&router, "/api/students/summary?newStudentIncome=-5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("newStudentIncome")));

        let uri = format!("/api/students/summary?coeReceivedIncome={}", i64::MAX);
        let (status, body) = get_json(&router, &uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("supported amount range")));

        let uri = format!("/api/students/calculation?coeAppliedIncome={}", i64::MAX);
        let (status, _) = get_json(&router, &uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
