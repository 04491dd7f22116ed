use super::domain::{Class, ClassId, CoeStatus, Student, StudentId};
use crate::dates::DateRange;
use crate::store::RepositoryError;

/// Predicate set for [`StudentRepository::find`]; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub coe_status: Option<CoeStatus>,
    pub class_id: Option<ClassId>,
    /// Case-insensitive substring over first or last name.
    pub name_contains: Option<String>,
    pub payment_received: Option<DateRange>,
    pub limit: Option<usize>,
}

impl StudentFilter {
    pub fn matches(&self, student: &Student) -> bool {
        if let Some(status) = self.coe_status {
            if student.coe_status != status {
                return false;
            }
        }
        if let Some(class_id) = &self.class_id {
            if student.class_id.as_ref() != Some(class_id) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            let needle = needle.to_lowercase();
            let hit = student.first_name.to_lowercase().contains(&needle)
                || student.last_name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(range) = &self.payment_received {
            if !range.contains_optional(student.payment_received_date) {
                return false;
            }
        }
        true
    }
}

/// Student collection port.
pub trait StudentRepository: Send + Sync {
    fn insert(&self, student: Student) -> Result<Student, RepositoryError>;
    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn list(&self) -> Result<Vec<Student>, RepositoryError>;
    fn find(&self, filter: &StudentFilter) -> Result<Vec<Student>, RepositoryError>;
    fn update(&self, student: Student) -> Result<(), RepositoryError>;
    /// Removes the record, handing back what was stored.
    fn delete(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    /// Unsets `class_id` on every student pointing at `class_id`.
    fn clear_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError>;
}

/// Class collection port. Membership edits are single atomic set operations.
pub trait ClassRepository: Send + Sync {
    fn insert(&self, class: Class) -> Result<Class, RepositoryError>;
    fn fetch(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError>;
    fn list(&self) -> Result<Vec<Class>, RepositoryError>;
    fn delete(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError>;
    /// Set-union: adding an existing member is a no-op.
    fn add_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError>;
    fn remove_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError>;
}
