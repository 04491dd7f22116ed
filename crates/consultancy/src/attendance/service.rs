use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{AttendanceMark, AttendanceRecord, AttendanceStatus, MonthSheet, MonthWindow};
use super::repository::AttendanceRepository;
use crate::admissions::{ClassId, ClassRepository, StudentRepository};
use crate::dates::parse_date;
use crate::error::ValidationError;
use crate::store::RepositoryError;

const REQUIRED: &str = "studentId, adDate and status";

/// Daily attendance marks and monthly class sheets.
pub struct AttendanceService<A, S, C> {
    attendance: Arc<A>,
    students: Arc<S>,
    classes: Arc<C>,
}

impl<A, S, C> AttendanceService<A, S, C>
where
    A: AttendanceRepository + 'static,
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
{
    pub fn new(attendance: Arc<A>, students: Arc<S>, classes: Arc<C>) -> Self {
        Self {
            attendance,
            students,
            classes,
        }
    }

    /// Inserts or overwrites the student's mark for the day.
    pub fn mark(&self, mark: AttendanceMark) -> Result<AttendanceRecord, AttendanceError> {
        let (Some(student), Some(ad_date), Some(status)) = (
            mark.student_id,
            mark.ad_date.filter(|raw| !raw.trim().is_empty()),
            mark.status.filter(|raw| !raw.trim().is_empty()),
        ) else {
            return Err(ValidationError::MissingFields { fields: REQUIRED }.into());
        };

        let ad_date = parse_date(&ad_date).map_err(|reason| ValidationError::Malformed {
            field: "adDate",
            reason,
        })?;
        let status =
            AttendanceStatus::parse(&status).ok_or_else(|| ValidationError::Malformed {
                field: "status",
                reason: format!("'{status}' is not one of Present, Absent, Leave, Late"),
            })?;

        if self.students.fetch(&student)?.is_none() {
            return Err(AttendanceError::NotFound {
                entity: "Student",
                id: student.0,
            });
        }

        let record = self.attendance.upsert(AttendanceRecord {
            student,
            ad_date,
            status,
        })?;
        info!(
            student = %record.student,
            date = %record.ad_date,
            status = ?record.status,
            "attendance marked"
        );
        Ok(record)
    }

    /// Members of `class_id` and their marks within the `YYYY-MM` month.
    pub fn month_sheet(
        &self,
        class_id: Option<&str>,
        month: Option<&str>,
    ) -> Result<MonthSheet, AttendanceError> {
        let (Some(class_id), Some(month)) = (
            class_id.filter(|raw| !raw.trim().is_empty()),
            month.filter(|raw| !raw.trim().is_empty()),
        ) else {
            return Err(ValidationError::MissingFields {
                fields: "classId and adMonth",
            }
            .into());
        };
        let window = MonthWindow::parse(month)?;

        let class_id = ClassId(class_id.to_string());
        let class = self
            .classes
            .fetch(&class_id)?
            .ok_or_else(|| AttendanceError::NotFound {
                entity: "Class",
                id: class_id.0.clone(),
            })?;

        let mut members = Vec::with_capacity(class.students.len());
        for id in &class.students {
            match self.students.fetch(id)? {
                Some(student) => members.push(student.summary()),
                None => warn!(class = %class.id, student = %id, "class lists a missing student"),
            }
        }
        let ids: Vec<_> = members.iter().map(|member| member.id.clone()).collect();
        let records = self.attendance.in_range(&ids, window.start, window.end)?;

        Ok(MonthSheet::build(members, records))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
