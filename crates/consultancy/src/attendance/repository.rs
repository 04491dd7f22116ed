use chrono::NaiveDate;

use super::domain::AttendanceRecord;
use crate::admissions::StudentId;
use crate::store::RepositoryError;

pub trait AttendanceRepository: Send + Sync {
    /// Inserts or overwrites the mark for `(student, ad_date)`.
    fn upsert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError>;
    /// Marks for `students` dated in `[start, end)`.
    fn in_range(
        &self,
        students: &[StudentId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
}
