use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::Local;

use super::domain::{EntryId, LedgerInput};
use super::repository::LedgerRepository;
use super::service::{LedgerError, LedgerService};
use crate::dates::RangeQuery;
use crate::error::{error_response, repository_status};

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        match self {
            LedgerError::Validation(err) => err.into_response(),
            LedgerError::NotFound { .. } => {
                error_response(StatusCode::NOT_FOUND, self.to_string())
            }
            LedgerError::Repository(err) => {
                error_response(repository_status(&err), err.to_string())
            }
        }
    }
}

/// Mounts list/create at `base_path` and delete at `base_path/:id`.
pub fn ledger_router<L>(service: Arc<LedgerService<L>>, base_path: &str) -> Router
where
    L: LedgerRepository + 'static,
{
    Router::new()
        .route(base_path, get(list_handler::<L>).post(create_handler::<L>))
        .route(&format!("{base_path}/:id"), delete(delete_handler::<L>))
        .with_state(service)
}

pub(crate) async fn list_handler<L>(
    State(service): State<Arc<LedgerService<L>>>,
    Query(query): Query<RangeQuery>,
) -> Response
where
    L: LedgerRepository + 'static,
{
    let range = match query.into_range() {
        Ok(range) => range,
        Err(err) => return err.into_response(),
    };
    match service.list(&range) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<L>(
    State(service): State<Arc<LedgerService<L>>>,
    Json(input): Json<LedgerInput>,
) -> Response
where
    L: LedgerRepository + 'static,
{
    match service.record(input, Local::now().date_naive()) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<L>(
    State(service): State<Arc<LedgerService<L>>>,
    Path(id): Path<String>,
) -> Response
where
    L: LedgerRepository + 'static,
{
    match service.delete(&EntryId(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
