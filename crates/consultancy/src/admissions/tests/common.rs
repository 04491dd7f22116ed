use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::admissions::{
    class_router, student_router, AdmissionsService, AdmissionsState, Class, ClassId,
    ClassRepository, EnumPolicy, NewClass, StudentId,
};
use crate::profile::PdfRenderer;
use crate::storage::{FileStore, StorageError, StoredFile, UploadKind};
use crate::store::{InMemoryStore, RepositoryError};

pub(super) type MemoryService = AdmissionsService<InMemoryStore, InMemoryStore>;

pub(super) fn build_service(policy: EnumPolicy) -> (MemoryService, InMemoryStore) {
    let store = InMemoryStore::new();
    let service = AdmissionsService::new(Arc::new(store.clone()), Arc::new(store.clone()), policy);
    (service, store)
}

pub(super) fn create_class<S, C>(service: &AdmissionsService<S, C>, name: &str) -> ClassId
where
    S: crate::admissions::StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    service
        .create_class(NewClass {
            name: Some(name.to_string()),
        })
        .expect("class created")
        .id
}

pub(super) fn student_payload(first_name: &str, extra: Value) -> Value {
    let mut payload = json!({
        "firstName": first_name,
        "lastName": "Shrestha",
        "phone": "9800000000",
    });
    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        base.extend(extra);
    }
    payload
}

pub(super) fn members(store: &InMemoryStore, class: &ClassId) -> Vec<StudentId> {
    ClassRepository::fetch(store, class)
        .expect("fetch works")
        .expect("class present")
        .students
}

pub(super) fn occurrences(members: &[StudentId], id: &StudentId) -> usize {
    members.iter().filter(|member| *member == id).count()
}

/// Class store whose membership writes can be switched to fail.
#[derive(Default)]
pub(super) struct FlakyClasses {
    inner: InMemoryStore,
    fail_add: AtomicBool,
    fail_remove: AtomicBool,
}

impl FlakyClasses {
    pub(super) fn wrapping(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub(super) fn fail_adds(&self) {
        self.fail_add.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_removes(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }
}

impl ClassRepository for FlakyClasses {
    fn insert(&self, class: Class) -> Result<Class, RepositoryError> {
        ClassRepository::insert(&self.inner, class)
    }

    fn fetch(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        ClassRepository::fetch(&self.inner, id)
    }

    fn list(&self) -> Result<Vec<Class>, RepositoryError> {
        ClassRepository::list(&self.inner)
    }

    fn delete(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        ClassRepository::delete(&self.inner, id)
    }

    fn add_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("class store offline".to_string()));
        }
        self.inner.add_member(id, student)
    }

    fn remove_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("class store offline".to_string()));
        }
        self.inner.remove_member(id, student)
    }
}

pub(super) fn build_flaky_service() -> (
    AdmissionsService<InMemoryStore, FlakyClasses>,
    InMemoryStore,
    Arc<FlakyClasses>,
) {
    let store = InMemoryStore::new();
    let classes = Arc::new(FlakyClasses::wrapping(store.clone()));
    let service = AdmissionsService::new(
        Arc::new(store.clone()),
        classes.clone(),
        EnumPolicy::Substitute,
    );
    (service, store, classes)
}

/// Upload store kept in memory for handler tests.
#[derive(Default)]
pub(super) struct MemoryFiles {
    files: Mutex<HashMap<(UploadKind, String), Vec<u8>>>,
}

impl MemoryFiles {
    pub(super) fn names(&self, kind: UploadKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .expect("files mutex poisoned")
            .keys()
            .filter(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl FileStore for MemoryFiles {
    fn save(
        &self,
        kind: UploadKind,
        stem: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let ext = original_name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let name = format!("{stem}{ext}");
        self.files
            .lock()
            .expect("files mutex poisoned")
            .insert((kind, name.clone()), bytes.to_vec());
        Ok(StoredFile {
            path: name.clone().into(),
            name,
        })
    }

    fn remove(&self, kind: UploadKind, name: &str) -> Result<(), StorageError> {
        self.files
            .lock()
            .expect("files mutex poisoned")
            .remove(&(kind, name.to_string()));
        Ok(())
    }

    fn open(
        &self,
        kind: UploadKind,
        name: &str,
    ) -> Result<Option<(Vec<u8>, mime::Mime)>, StorageError> {
        Ok(self
            .files
            .lock()
            .expect("files mutex poisoned")
            .get(&(kind, name.to_string()))
            .map(|bytes| (bytes.clone(), mime_guess::from_path(name).first_or_octet_stream())))
    }
}

pub(super) fn admissions_app<S, C>(
    service: Arc<AdmissionsService<S, C>>,
    files: Arc<MemoryFiles>,
) -> axum::Router
where
    S: crate::admissions::StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    let state = AdmissionsState {
        service: service.clone(),
        files,
        renderer: Arc::new(PdfRenderer),
    };
    student_router(state).merge(class_router(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
