use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::domain::{ClassAssignment, ClassId, NewClass, Student, StudentDocument, StudentId};
use super::repository::{ClassRepository, StudentRepository};
use super::service::{AdmissionsService, StudentServiceError};
use crate::error::{error_response, repository_status, ValidationError};
use crate::profile::{Photo, ProfileDocument, ProfileRenderer};
use crate::storage::{FileStore, StorageError, UploadKind};

impl IntoResponse for StudentServiceError {
    fn into_response(self) -> Response {
        match self {
            StudentServiceError::Validation(err) => err.into_response(),
            StudentServiceError::Normalization(err) => {
                error_response(StatusCode::BAD_REQUEST, err.to_string())
            }
            StudentServiceError::NotFound { .. } => {
                error_response(StatusCode::NOT_FOUND, self.to_string())
            }
            StudentServiceError::Repository(err) => {
                error_response(repository_status(&err), err.to_string())
            }
            StudentServiceError::Sync(err) => {
                let payload = json!({
                    "error": err.to_string(),
                    "completed": err.completed,
                    "failed": err.failed,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
            }
        }
    }
}

fn storage_response(err: StorageError) -> Response {
    match err {
        StorageError::InvalidName(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        StorageError::Io(_) => {
            warn!(error = %err, "file storage failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Shared state for the student routes: the service plus its outer collaborators.
pub struct AdmissionsState<S, C> {
    pub service: Arc<AdmissionsService<S, C>>,
    pub files: Arc<dyn FileStore>,
    pub renderer: Arc<dyn ProfileRenderer>,
}

impl<S, C> Clone for AdmissionsState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            files: Arc::clone(&self.files),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

/// Student CRUD, search, uploads, and profile export.
pub fn student_router<S, C>(state: AdmissionsState<S, C>) -> Router
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    Router::new()
        .route(
            "/api/students",
            get(list_students_handler::<S, C>).post(create_student_handler::<S, C>),
        )
        .route("/api/students/search", get(search_handler::<S, C>))
        .route(
            "/api/students/:id",
            get(get_student_handler::<S, C>)
                .put(update_student_handler::<S, C>)
                .delete(delete_student_handler::<S, C>),
        )
        .route(
            "/api/students/:id/profile-image",
            put(profile_image_handler::<S, C>),
        )
        .route("/api/students/:id/documents", post(documents_handler::<S, C>))
        .route("/api/students/:id/profile", get(profile_handler::<S, C>))
        .with_state(state)
}

/// Class listing, creation, deletion, and membership edits.
pub fn class_router<S, C>(service: Arc<AdmissionsService<S, C>>) -> Router
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    Router::new()
        .route(
            "/api/classes",
            get(list_classes_handler::<S, C>).post(create_class_handler::<S, C>),
        )
        .route("/api/classes/:class_id", delete(delete_class_handler::<S, C>))
        .route(
            "/api/classes/:class_id/students",
            post(assign_handler::<S, C>),
        )
        .route(
            "/api/classes/:class_id/students/:student_id",
            delete(unassign_handler::<S, C>),
        )
        .with_state(service)
}

pub(crate) async fn list_students_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.list() {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_student_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Json(payload): Json<Value>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.create(payload) {
        Ok(student) => (StatusCode::CREATED, Json(json!({ "student": student }))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

pub(crate) async fn search_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.search(params.q.as_deref()) {
        Ok(hits) => (StatusCode::OK, Json(hits)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn get_student_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.view(&StudentId(id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_student_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.update(&StudentId(id), payload) {
        Ok(student) => (StatusCode::OK, Json(json!({ "student": student }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_student_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match state.service.delete(&StudentId(id)) {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Student deleted successfully" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Collects every non-empty file sent under `field`; other parts are ignored.
async fn read_uploads(
    multipart: &mut Multipart,
    field: &'static str,
) -> Result<Vec<Upload>, Response> {
    let mut uploads = Vec::new();
    loop {
        let part = match multipart.next_field().await {
            Ok(Some(part)) => part,
            Ok(None) => break,
            Err(err) => return Err(ValidationError::Body(err.body_text()).into_response()),
        };
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().unwrap_or(field).to_string();
        let bytes = part
            .bytes()
            .await
            .map_err(|err| ValidationError::Body(err.body_text()).into_response())?;
        if !bytes.is_empty() {
            uploads.push(Upload { file_name, bytes });
        }
    }
    Ok(uploads)
}

pub(crate) async fn profile_image_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    let id = StudentId(id);
    let uploads = match read_uploads(&mut multipart, "profileImage").await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };
    let Some(upload) = uploads.into_iter().next() else {
        return ValidationError::NoUpload("profileImage").into_response();
    };
    if let Err(err) = state.service.get(&id) {
        return err.into_response();
    }

    let stored = match state.files.save(
        UploadKind::ProfileImage,
        &id.0,
        &upload.file_name,
        &upload.bytes,
    ) {
        Ok(stored) => stored,
        Err(err) => return storage_response(err),
    };

    match state.service.set_profile_image(&id, stored.name.clone()) {
        Ok((student, previous)) => {
            if let Some(old) = previous.filter(|old| *old != stored.name) {
                if let Err(err) = state.files.remove(UploadKind::ProfileImage, &old) {
                    warn!(
                        student = %id,
                        file = %old,
                        error = %err,
                        "failed to remove replaced profile image"
                    );
                }
            }
            (
                StatusCode::OK,
                Json(json!({ "message": "Profile image updated", "student": student })),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn documents_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    let id = StudentId(id);
    let uploads = match read_uploads(&mut multipart, "documents").await {
        Ok(uploads) => uploads,
        Err(response) => return response,
    };
    if uploads.is_empty() {
        return ValidationError::NoUpload("documents").into_response();
    }
    if let Err(err) = state.service.get(&id) {
        return err.into_response();
    }

    let batch = Utc::now().timestamp_millis();
    let mut documents = Vec::with_capacity(uploads.len());
    for (index, upload) in uploads.iter().enumerate() {
        let stem = format!("{id}-{batch}-{index}");
        match state
            .files
            .save(UploadKind::Document, &stem, &upload.file_name, &upload.bytes)
        {
            Ok(stored) => documents.push(StudentDocument {
                file_name: upload.file_name.clone(),
                file_path: UploadKind::Document.public_path(&stored.name),
            }),
            Err(err) => return storage_response(err),
        }
    }

    match state.service.attach_documents(&id, documents) {
        Ok(student) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Documents uploaded", "student": student })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn profile_handler<S, C>(
    State(state): State<AdmissionsState<S, C>>,
    Path(id): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    let student = match state.service.get(&StudentId(id)) {
        Ok(student) => student,
        Err(err) => return err.into_response(),
    };

    let mut document = ProfileDocument::from_student(&student);
    if let Some(photo) = profile_photo(state.files.as_ref(), &student) {
        document = document.with_photo(photo);
    }
    match state.renderer.render(&document) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, state.renderer.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", document.file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            warn!(student = %student.id, error = %err, "profile rendering failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// The stored profile image, when it exists and is a JPEG.
fn profile_photo(files: &dyn FileStore, student: &Student) -> Option<Photo> {
    let name = student.profile_image.as_deref()?;
    match files.open(UploadKind::ProfileImage, name) {
        Ok(Some((bytes, mime))) => {
            let photo = Photo::from_jpeg(bytes);
            if photo.is_none() {
                debug!(student = %student.id, %mime, "profile image is not a JPEG; left out");
            }
            photo
        }
        Ok(None) => None,
        Err(err) => {
            warn!(student = %student.id, error = %err, "failed to read profile image");
            None
        }
    }
}

pub(crate) async fn list_classes_handler<S, C>(
    State(service): State<Arc<AdmissionsService<S, C>>>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.list_classes() {
        Ok(classes) => (StatusCode::OK, Json(classes)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_class_handler<S, C>(
    State(service): State<Arc<AdmissionsService<S, C>>>,
    Json(request): Json<NewClass>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.create_class(request) {
        Ok(class) => (StatusCode::CREATED, Json(class)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_class_handler<S, C>(
    State(service): State<Arc<AdmissionsService<S, C>>>,
    Path(class_id): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.delete_class(&ClassId(class_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn assign_handler<S, C>(
    State(service): State<Arc<AdmissionsService<S, C>>>,
    Path(class_id): Path<String>,
    Json(request): Json<ClassAssignment>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.assign(&ClassId(class_id), request) {
        Ok(class) => (StatusCode::OK, Json(class)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn unassign_handler<S, C>(
    State(service): State<Arc<AdmissionsService<S, C>>>,
    Path((class_id, student_id)): Path<(String, String)>,
) -> Response
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    match service.unassign(&ClassId(class_id), &StudentId(student_id)) {
        Ok(class) => (StatusCode::OK, Json(class)).into_response(),
        Err(err) => err.into_response(),
    }
}
