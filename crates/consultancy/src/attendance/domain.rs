use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::admissions::{StudentId, StudentSummary};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    Late,
}

impl AttendanceStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Present" => Some(Self::Present),
            "Absent" => Some(Self::Absent),
            "Leave" => Some(Self::Leave),
            "Late" => Some(Self::Late),
            _ => None,
        }
    }
}

/// One mark per student per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student: StudentId,
    pub ad_date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Raw request body; every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub ad_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Calendar month `[start, end)` parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::Malformed {
            field: "adMonth",
            reason: format!("'{raw}' is not YYYY-MM"),
        };

        let (year, month) = raw.trim().split_once('-').ok_or_else(malformed)?;
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(malformed)?;
        let end = if start.month() == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(malformed)?;

        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// A class's students and their marks for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSheet {
    pub students: Vec<StudentSummary>,
    /// `records_map[student][YYYY-MM-DD] = status`
    pub records_map: BTreeMap<StudentId, BTreeMap<String, AttendanceStatus>>,
}

impl MonthSheet {
    pub fn build(students: Vec<StudentSummary>, records: Vec<AttendanceRecord>) -> Self {
        let mut records_map: BTreeMap<StudentId, BTreeMap<String, AttendanceStatus>> =
            BTreeMap::new();
        for record in records {
            records_map
                .entry(record.student)
                .or_default()
                .insert(record.ad_date.format("%Y-%m-%d").to_string(), record.status);
        }
        Self {
            students,
            records_map,
        }
    }
}
