use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    Class, ClassAssignment, ClassId, ClassRef, ClassView, NewClass, SearchHit, Student,
    StudentDocument, StudentId, StudentInput, StudentView,
};
use super::income::{apply_coe_transition, eligibility_delta, BonusState};
use super::membership::{
    self, apply_changes, membership_changes, SyncError, SyncFailure, SyncLog, SyncStep,
};
use super::normalize::{EnumNormalizer, EnumPolicy, NormalizationError};
use super::repository::{ClassRepository, StudentFilter, StudentRepository};
use crate::error::ValidationError;
use crate::store::{next_id, RepositoryError};

const SEARCH_LIMIT: usize = 10;

/// Student and class operations over injected store ports.
///
/// Holds no state of its own; concurrent calls touching the same student or
/// class race at the store exactly as separate requests would.
pub struct AdmissionsService<S, C> {
    students: Arc<S>,
    classes: Arc<C>,
    normalizer: EnumNormalizer,
}

impl<S, C> AdmissionsService<S, C>
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    pub fn new(students: Arc<S>, classes: Arc<C>, policy: EnumPolicy) -> Self {
        Self::with_normalizer(students, classes, EnumNormalizer::for_students(policy))
    }

    pub fn with_normalizer(students: Arc<S>, classes: Arc<C>, normalizer: EnumNormalizer) -> Self {
        Self {
            students,
            classes,
            normalizer,
        }
    }

    pub fn students(&self) -> &Arc<S> {
        &self.students
    }

    pub fn classes(&self) -> &Arc<C> {
        &self.classes
    }

    /// Normalizes status fields, then decodes the payload into typed input.
    pub fn parse_input(&self, payload: Value) -> Result<StudentInput, StudentServiceError> {
        let Value::Object(mut fields) = payload else {
            return Err(ValidationError::Body("expected a JSON object".to_string()).into());
        };

        for substitution in self.normalizer.normalize(&mut fields)? {
            warn!(
                field = substitution.field,
                rejected = %substitution.rejected,
                replacement = substitution.replacement,
                "status value outside allowed set replaced with default"
            );
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|err| ValidationError::Body(err.to_string()).into())
    }

    pub fn create(&self, payload: Value) -> Result<Student, StudentServiceError> {
        let input = self.parse_input(payload)?;
        if input
            .first_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty())
        {
            return Err(ValidationError::MissingField("firstName").into());
        }

        let requested = input.coe_status.unwrap_or_default();
        let class_id = input.class_id.clone().flatten();
        if let Some(class_id) = &class_id {
            self.require_class(class_id)?;
        }

        let mut student = input.into_student(StudentId(next_id("stu")));
        let bonus = apply_coe_transition(
            BonusState::initial(student.eligible_for_income_bonus),
            requested,
        );
        student.coe_status = requested;
        student.income = bonus.income;
        student.coe_bonus_stage = bonus.stage;

        let student = self.students.insert(student)?;
        let mut log = SyncLog::new();
        log.record(SyncStep::SaveStudent {
            student: student.id.clone(),
        });
        apply_changes(
            &*self.classes,
            &mut log,
            &student.id,
            &membership_changes(None, class_id.as_ref()),
        )?;

        info!(
            student = %student.id,
            income = student.income,
            class = ?student.class_id,
            "student created"
        );
        Ok(student)
    }

    /// Partial update; COE changes move income through the bonus table.
    pub fn update(&self, id: &StudentId, payload: Value) -> Result<Student, StudentServiceError> {
        let input = self.parse_input(payload)?;
        if matches!(input.first_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::MissingField("firstName").into());
        }

        let existing = self.require_student(id)?;
        let requested = input.coe_status;
        if let Some(Some(class_id)) = &input.class_id {
            if existing.class_id.as_ref() != Some(class_id) {
                self.require_class(class_id)?;
            }
        }

        let mut updated = existing.clone();
        input.apply_to(&mut updated);

        let mut bonus = BonusState {
            income: existing.income
                + eligibility_delta(
                    existing.eligible_for_income_bonus,
                    updated.eligible_for_income_bonus,
                ),
            stage: existing.coe_bonus_stage,
        };
        if let Some(requested) = requested {
            bonus = apply_coe_transition(bonus, requested);
            updated.coe_status = requested;
        }
        updated.income = bonus.income;
        updated.coe_bonus_stage = bonus.stage;

        self.students.update(updated.clone())?;
        let mut log = SyncLog::new();
        log.record(SyncStep::SaveStudent {
            student: updated.id.clone(),
        });
        apply_changes(
            &*self.classes,
            &mut log,
            &updated.id,
            &membership_changes(existing.class_id.as_ref(), updated.class_id.as_ref()),
        )?;

        if existing.coe_bonus_stage != updated.coe_bonus_stage {
            info!(
                student = %updated.id,
                from = ?existing.coe_bonus_stage,
                to = ?updated.coe_bonus_stage,
                income = updated.income,
                "coe bonus stage changed"
            );
        }
        info!(student = %updated.id, "student updated");
        Ok(updated)
    }

    pub fn delete(&self, id: &StudentId) -> Result<Student, StudentServiceError> {
        let removed = self
            .students
            .delete(id)?
            .ok_or_else(|| StudentServiceError::not_found("Student", id))?;

        let mut log = SyncLog::new();
        log.record(SyncStep::DeleteStudent {
            student: removed.id.clone(),
        });
        apply_changes(
            &*self.classes,
            &mut log,
            &removed.id,
            &membership_changes(removed.class_id.as_ref(), None),
        )?;

        info!(student = %removed.id, "student deleted");
        Ok(removed)
    }

    pub fn get(&self, id: &StudentId) -> Result<Student, StudentServiceError> {
        self.require_student(id)
    }

    /// Student with its class reference populated.
    pub fn view(&self, id: &StudentId) -> Result<StudentView, StudentServiceError> {
        let student = self.require_student(id)?;
        let class = match &student.class_id {
            Some(class_id) => self.classes.fetch(class_id)?.map(|class| ClassRef {
                id: class.id,
                name: class.name,
            }),
            None => None,
        };
        Ok(StudentView { student, class })
    }

    pub fn list(&self) -> Result<Vec<StudentView>, StudentServiceError> {
        let names: HashMap<ClassId, String> = self
            .classes
            .list()?
            .into_iter()
            .map(|class| (class.id, class.name))
            .collect();

        let views = self
            .students
            .list()?
            .into_iter()
            .map(|student| {
                let class = student.class_id.as_ref().and_then(|class_id| {
                    names.get(class_id).map(|name| ClassRef {
                        id: class_id.clone(),
                        name: name.clone(),
                    })
                });
                StudentView { student, class }
            })
            .collect();
        Ok(views)
    }

    /// Name search; no query or no hits yields the "Not found" placeholder.
    pub fn search(&self, query: Option<&str>) -> Result<Vec<SearchHit>, StudentServiceError> {
        let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) else {
            return Ok(vec![SearchHit::not_found()]);
        };

        let filter = StudentFilter {
            name_contains: Some(query.to_string()),
            limit: Some(SEARCH_LIMIT),
            ..StudentFilter::default()
        };
        let hits: Vec<SearchHit> = self
            .students
            .find(&filter)?
            .into_iter()
            .map(|student| SearchHit {
                name: student.full_name(),
                id: Some(student.id),
            })
            .collect();

        if hits.is_empty() {
            Ok(vec![SearchHit::not_found()])
        } else {
            Ok(hits)
        }
    }

    /// Points the student at a newly stored image, returning the replaced file name.
    pub fn set_profile_image(
        &self,
        id: &StudentId,
        file_name: String,
    ) -> Result<(Student, Option<String>), StudentServiceError> {
        let mut student = self.require_student(id)?;
        let previous = student.profile_image.replace(file_name);
        self.students.update(student.clone())?;
        info!(student = %student.id, "profile image replaced");
        Ok((student, previous))
    }

    pub fn attach_documents(
        &self,
        id: &StudentId,
        documents: Vec<StudentDocument>,
    ) -> Result<Student, StudentServiceError> {
        let mut student = self.require_student(id)?;
        let added = documents.len();
        student.documents.extend(documents);
        self.students.update(student.clone())?;
        info!(student = %student.id, added, "documents attached");
        Ok(student)
    }

    pub fn create_class(&self, request: NewClass) -> Result<Class, StudentServiceError> {
        let name = request
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::MissingField("name"))?;

        let class = self.classes.insert(Class {
            id: ClassId(next_id("cls")),
            name,
            students: Vec::new(),
        })?;
        info!(class = %class.id, name = %class.name, "class created");
        Ok(class)
    }

    pub fn list_classes(&self) -> Result<Vec<ClassView>, StudentServiceError> {
        self.classes
            .list()?
            .into_iter()
            .map(|class| self.class_view(class))
            .collect()
    }

    /// Deletes the class and detaches its students; returns how many were detached.
    pub fn delete_class(&self, id: &ClassId) -> Result<usize, StudentServiceError> {
        match membership::delete_class(&*self.students, &*self.classes, id) {
            Ok((cleared, _)) => {
                info!(class = %id, cleared, "class deleted");
                Ok(cleared)
            }
            Err(SyncFailure::FirstStep(RepositoryError::NotFound)) => {
                Err(StudentServiceError::not_found("Class", id))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Moves a student into `class_id`, leaving any previous class.
    pub fn assign(
        &self,
        class_id: &ClassId,
        request: ClassAssignment,
    ) -> Result<ClassView, StudentServiceError> {
        let student_id = request
            .student_id
            .ok_or(ValidationError::MissingField("studentId"))?;
        self.require_class(class_id)?;
        let mut student = self.require_student(&student_id)?;
        let previous = student.class_id.replace(class_id.clone());

        let mut log = SyncLog::new();
        if previous.as_ref() == Some(class_id) {
            // Already pointing here; re-add in case the class set drifted.
            log.step(
                SyncStep::AddToClass {
                    class: class_id.clone(),
                    student: student_id.clone(),
                },
                || self.classes.add_member(class_id, &student_id),
            )?;
        } else {
            self.students.update(student)?;
            log.record(SyncStep::SaveStudent {
                student: student_id.clone(),
            });
            apply_changes(
                &*self.classes,
                &mut log,
                &student_id,
                &membership_changes(previous.as_ref(), Some(class_id)),
            )?;
        }

        info!(class = %class_id, student = %student_id, from = ?previous, "student assigned");
        self.class_view(self.require_class(class_id)?)
    }

    /// Removes a student from `class_id` and clears its reference if it pointed here.
    pub fn unassign(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<ClassView, StudentServiceError> {
        self.require_class(class_id)?;

        let mut log = SyncLog::new();
        log.step(
            SyncStep::RemoveFromClass {
                class: class_id.clone(),
                student: student_id.clone(),
            },
            || self.classes.remove_member(class_id, student_id),
        )?;

        if let Some(mut student) = self.students.fetch(student_id)? {
            if student.class_id.as_ref() == Some(class_id) {
                student.class_id = None;
                log.step(
                    SyncStep::SaveStudent {
                        student: student_id.clone(),
                    },
                    || self.students.update(student),
                )?;
            }
        }

        info!(class = %class_id, student = %student_id, "student unassigned");
        self.class_view(self.require_class(class_id)?)
    }

    fn class_view(&self, class: Class) -> Result<ClassView, StudentServiceError> {
        let mut members = Vec::with_capacity(class.students.len());
        for id in &class.students {
            match self.students.fetch(id)? {
                Some(student) => members.push(student.summary()),
                None => warn!(class = %class.id, student = %id, "class lists a missing student"),
            }
        }
        Ok(ClassView {
            id: class.id,
            name: class.name,
            students: members,
        })
    }

    fn require_student(&self, id: &StudentId) -> Result<Student, StudentServiceError> {
        self.students
            .fetch(id)?
            .ok_or_else(|| StudentServiceError::not_found("Student", id))
    }

    fn require_class(&self, id: &ClassId) -> Result<Class, StudentServiceError> {
        self.classes
            .fetch(id)?
            .ok_or_else(|| StudentServiceError::not_found("Class", id))
    }
}

/// Error raised by the admissions service.
#[derive(Debug, thiserror::Error)]
pub enum StudentServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl StudentServiceError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<SyncFailure> for StudentServiceError {
    fn from(value: SyncFailure) -> Self {
        match value {
            SyncFailure::FirstStep(err) => Self::Repository(err),
            SyncFailure::Partial(err) => {
                warn!(
                    failed = %err.failed,
                    completed = err.completed.len(),
                    error = %err.source,
                    "membership sync left student and class out of step"
                );
                Self::Sync(err)
            }
        }
    }
}
