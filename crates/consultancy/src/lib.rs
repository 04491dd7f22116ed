//! Back office for a student consultancy: students, classes, attendance,
//! payments, and the income figures derived from them.

pub mod admissions;
pub mod attendance;
pub mod config;
pub mod dates;
pub mod error;
pub mod ledger;
pub mod profile;
pub mod reporting;
pub mod storage;
pub mod store;
pub mod telemetry;
