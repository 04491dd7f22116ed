//! Student intake and class rosters.
//!
//! Requests pass through the [`EnumNormalizer`] before decoding, income is
//! kept by the COE bonus state machine in [`income`], and every write that
//! touches a class reference goes through [`membership`] so both sides of
//! the student/class link move together.

pub mod domain;
pub mod income;
pub mod membership;
pub mod normalize;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AcademicRecord, AdmissionStatus, Class, ClassAssignment, ClassId, ClassRef, ClassView,
    CoeBonusStage, CoeStatus, CourseStatus, FamilyMember, InterviewStatus, NewClass, SearchHit,
    StatusField, Student, StudentDocument, StudentId, StudentInput, StudentSummary, StudentView,
    VisaStatus, WorkExperience,
};
pub use income::{apply_coe_transition, coe_transition, BonusState, ENROLMENT_BONUS};
pub use membership::{SyncError, SyncStep};
pub use normalize::{EnumNormalizer, EnumPolicy, NormalizationError, Substitution};
pub use repository::{ClassRepository, StudentFilter, StudentRepository};
pub use router::{class_router, student_router, AdmissionsState};
pub use service::{AdmissionsService, StudentServiceError};
