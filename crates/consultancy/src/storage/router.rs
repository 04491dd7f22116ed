use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::warn;

use super::{FileStore, StorageError, UploadKind};
use crate::error::error_response;

/// Serves stored uploads at `/uploads/:kind/:name`.
pub fn upload_router(files: Arc<dyn FileStore>) -> Router {
    Router::new()
        .route("/uploads/:kind/:name", get(serve_upload))
        .with_state(files)
}

pub(crate) async fn serve_upload(
    State(files): State<Arc<dyn FileStore>>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let Some(kind) = UploadKind::from_segment(&kind) else {
        return error_response(StatusCode::NOT_FOUND, "File not found");
    };

    match files.open(kind, &name) {
        Ok(Some((bytes, mime))) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "File not found"),
        Err(StorageError::InvalidName(name)) => {
            error_response(StatusCode::BAD_REQUEST, format!("invalid file name '{name}'"))
        }
        Err(err) => {
            warn!(error = %err, "failed to read upload");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
