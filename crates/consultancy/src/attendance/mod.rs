//! Daily attendance per student, read back as monthly class sheets.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{AttendanceMark, AttendanceRecord, AttendanceStatus, MonthSheet, MonthWindow};
pub use repository::AttendanceRepository;
pub use router::attendance_router;
pub use service::{AttendanceError, AttendanceService};
