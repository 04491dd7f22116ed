//! Keeps `Student::class_id` and `Class::students` pointing at each other.
//!
//! Every operation is a sequence of independent store writes. Nothing is
//! rolled back: when a step fails after an earlier one landed, the caller
//! gets a [`SyncError`] naming what was written and what was not, and the
//! two collections may disagree until someone reconciles them.

use std::fmt;

use serde::Serialize;

use super::domain::{ClassId, StudentId};
use super::repository::{ClassRepository, StudentRepository};
use crate::store::RepositoryError;

/// A single store write performed during a membership-affecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SyncStep {
    SaveStudent { student: StudentId },
    DeleteStudent { student: StudentId },
    AddToClass { class: ClassId, student: StudentId },
    RemoveFromClass { class: ClassId, student: StudentId },
    DeleteClass { class: ClassId },
    ClearClassReferences { class: ClassId },
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStep::SaveStudent { student } => write!(f, "save student {student}"),
            SyncStep::DeleteStudent { student } => write!(f, "delete student {student}"),
            SyncStep::AddToClass { class, student } => {
                write!(f, "add student {student} to class {class}")
            }
            SyncStep::RemoveFromClass { class, student } => {
                write!(f, "remove student {student} from class {class}")
            }
            SyncStep::DeleteClass { class } => write!(f, "delete class {class}"),
            SyncStep::ClearClassReferences { class } => {
                write!(f, "clear student references to class {class}")
            }
        }
    }
}

/// A later step failed after earlier steps were already persisted.
#[derive(Debug, thiserror::Error)]
#[error("membership sync failed to {failed} after {} completed step(s): {source}", .completed.len())]
pub struct SyncError {
    pub completed: Vec<SyncStep>,
    pub failed: SyncStep,
    pub source: RepositoryError,
}

/// Membership edit implied by a change of class reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Leave(ClassId),
    Join(ClassId),
}

/// Edits needed to move a student from `previous` to `next`; empty when equal.
pub fn membership_changes(
    previous: Option<&ClassId>,
    next: Option<&ClassId>,
) -> Vec<MembershipChange> {
    if previous == next {
        return Vec::new();
    }

    let mut changes = Vec::with_capacity(2);
    if let Some(old) = previous {
        changes.push(MembershipChange::Leave(old.clone()));
    }
    if let Some(new) = next {
        changes.push(MembershipChange::Join(new.clone()));
    }
    changes
}

/// Ordered log of the writes an operation has performed so far.
#[derive(Debug, Default)]
pub struct SyncLog {
    completed: Vec<SyncStep>,
}

impl SyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a write the caller already performed.
    pub fn record(&mut self, step: SyncStep) {
        self.completed.push(step);
    }

    /// Runs one write; on failure returns everything logged before it.
    pub fn step<F>(&mut self, step: SyncStep, write: F) -> Result<(), SyncFailure>
    where
        F: FnOnce() -> Result<(), RepositoryError>,
    {
        match write() {
            Ok(()) => {
                self.completed.push(step);
                Ok(())
            }
            Err(source) if self.completed.is_empty() => Err(SyncFailure::FirstStep(source)),
            Err(source) => Err(SyncFailure::Partial(SyncError {
                completed: std::mem::take(&mut self.completed),
                failed: step,
                source,
            })),
        }
    }

    pub fn completed(&self) -> &[SyncStep] {
        &self.completed
    }

    pub fn into_steps(self) -> Vec<SyncStep> {
        self.completed
    }
}

/// Failure of a logged operation: nothing written yet, or a partial write.
#[derive(Debug, thiserror::Error)]
pub enum SyncFailure {
    #[error(transparent)]
    FirstStep(RepositoryError),
    #[error(transparent)]
    Partial(SyncError),
}

/// Applies class membership edits for `student`, continuing `log`.
pub fn apply_changes<C>(
    classes: &C,
    log: &mut SyncLog,
    student: &StudentId,
    changes: &[MembershipChange],
) -> Result<(), SyncFailure>
where
    C: ClassRepository + ?Sized,
{
    for change in changes {
        match change {
            MembershipChange::Leave(class) => log.step(
                SyncStep::RemoveFromClass {
                    class: class.clone(),
                    student: student.clone(),
                },
                || classes.remove_member(class, student),
            )?,
            MembershipChange::Join(class) => log.step(
                SyncStep::AddToClass {
                    class: class.clone(),
                    student: student.clone(),
                },
                || classes.add_member(class, student),
            )?,
        }
    }
    Ok(())
}

/// Deletes a class, then detaches every student that referenced it.
pub fn delete_class<S, C>(
    students: &S,
    classes: &C,
    class: &ClassId,
) -> Result<(usize, Vec<SyncStep>), SyncFailure>
where
    S: StudentRepository + ?Sized,
    C: ClassRepository + ?Sized,
{
    let mut log = SyncLog::new();
    log.step(SyncStep::DeleteClass { class: class.clone() }, || {
        classes
            .delete(class)?
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    })?;

    let mut cleared = 0;
    log.step(
        SyncStep::ClearClassReferences {
            class: class.clone(),
        },
        || {
            cleared = students.clear_class(class)?;
            Ok(())
        },
    )?;

    Ok((cleared, log.into_steps()))
}
