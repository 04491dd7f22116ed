use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates::deserialize_optional_date;

/// Identifier wrapper for enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Identifier wrapper for classes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status-like field with a closed set of wire values and a fallback.
pub trait StatusField: Sized + Copy + Default + 'static {
    /// Wire name of the field carrying this status.
    const FIELD: &'static str;
    /// Every accepted wire value, in declaration order.
    const ALLOWED: &'static [&'static str];

    fn label(self) -> &'static str;
}

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal, default = $default:ident,
        [$($variant:ident => $label:literal),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl StatusField for $name {
            const FIELD: &'static str = $field;
            const ALLOWED: &'static [&'static str] = &[$($label),+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

status_enum!(
    /// Certificate-of-enrollment progress as requested by staff.
    CoeStatus, field = "COEStatus", default = Pending,
    [Pending => "Pending", Applied => "Applied", Received => "Received"]
);

status_enum!(
    VisaStatus, field = "visaStatus", default = NotApplied,
    [NotApplied => "Not Applied", Applied => "Applied", Granted => "Granted", Rejected => "Rejected"]
);

status_enum!(
    AdmissionStatus, field = "admissionStatus", default = Pending,
    [Pending => "Pending", Offered => "Offered", Accepted => "Accepted", Rejected => "Rejected"]
);

status_enum!(
    CourseStatus, field = "courseStatus", default = NotStarted,
    [NotStarted => "Not Started", Ongoing => "Ongoing", Completed => "Completed", Dropped => "Dropped"]
);

status_enum!(
    InterviewStatus, field = "interviewStatus", default = NotScheduled,
    [NotScheduled => "Not Scheduled", Scheduled => "Scheduled", Passed => "Passed", Failed => "Failed"]
);

/// Bonus already booked against a student's income for COE progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoeBonusStage {
    #[default]
    None,
    Applied,
    Received,
}

/// Prior schooling entry captured on intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicRecord {
    #[serde(rename = "type")]
    pub level: String,
    pub school_name: String,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub name: String,
    pub relationship: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub organization: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub to: Option<NaiveDate>,
}

/// Uploaded supporting document reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDocument {
    pub file_name: String,
    pub file_path: String,
}

/// Persisted student record. `income` and `coe_bonus_stage` are server-managed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub pob: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub curr_add: Option<String>,
    #[serde(default)]
    pub temp_add: Option<String>,
    #[serde(default)]
    pub per_add: Option<String>,
    #[serde(default)]
    pub pass_num: Option<String>,
    #[serde(default)]
    pub pass_doi: Option<NaiveDate>,
    #[serde(default)]
    pub pass_doe: Option<NaiveDate>,
    #[serde(default)]
    pub consultancy_admission_date: Option<NaiveDate>,
    #[serde(default)]
    pub selected_college_name: Option<String>,
    #[serde(rename = "COEStatus", default)]
    pub coe_status: CoeStatus,
    #[serde(default)]
    pub visa_status: VisaStatus,
    #[serde(default)]
    pub admission_status: AdmissionStatus,
    #[serde(default)]
    pub course_status: CourseStatus,
    #[serde(default)]
    pub interview_status: InterviewStatus,
    #[serde(default)]
    pub payment_received: i64,
    #[serde(default)]
    pub payment_received_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_remaining: i64,
    #[serde(default)]
    pub expected_month_of_payment: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub eligible_for_income_bonus: bool,
    #[serde(default)]
    pub coe_bonus_stage: CoeBonusStage,
    #[serde(default)]
    pub income: i64,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub academic_records: Vec<AcademicRecord>,
    #[serde(default)]
    pub family_members: Vec<FamilyMember>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub documents: Vec<StudentDocument>,
}

impl Student {
    pub fn full_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            coe_status: self.coe_status,
        }
    }
}

/// Group of students taught together; `students` holds each id at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub students: Vec<StudentId>,
}

/// Proposed student field values after enum normalization.
///
/// Every field is optional so the same payload drives both create and partial
/// update. `class_id` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(None)`), which detaches the student from its class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub dob: Option<NaiveDate>,
    pub pob: Option<String>,
    pub email: Option<String>,
    pub curr_add: Option<String>,
    pub temp_add: Option<String>,
    pub per_add: Option<String>,
    pub pass_num: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub pass_doi: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub pass_doe: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub consultancy_admission_date: Option<NaiveDate>,
    pub selected_college_name: Option<String>,
    #[serde(rename = "COEStatus")]
    pub coe_status: Option<CoeStatus>,
    pub visa_status: Option<VisaStatus>,
    pub admission_status: Option<AdmissionStatus>,
    pub course_status: Option<CourseStatus>,
    pub interview_status: Option<InterviewStatus>,
    pub payment_received: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub payment_received_date: Option<NaiveDate>,
    pub payment_remaining: Option<i64>,
    pub expected_month_of_payment: Option<String>,
    pub remarks: Option<String>,
    pub eligible_for_income_bonus: Option<bool>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub class_id: Option<Option<ClassId>>,
    pub academic_records: Option<Vec<AcademicRecord>>,
    pub family_members: Option<Vec<FamilyMember>>,
    pub work_experiences: Option<Vec<WorkExperience>>,
    pub documents: Option<Vec<StudentDocument>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<ClassId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(
        value
            .filter(|raw| !raw.trim().is_empty())
            .map(ClassId),
    ))
}

impl StudentInput {
    /// Builds a fresh record; status fields fall back to their defaults.
    /// Income fields are left zeroed for the bonus engine to fill in.
    pub fn into_student(self, id: StudentId) -> Student {
        let mut student = Student {
            id,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            sex: None,
            dob: None,
            pob: None,
            email: None,
            curr_add: None,
            temp_add: None,
            per_add: None,
            pass_num: None,
            pass_doi: None,
            pass_doe: None,
            consultancy_admission_date: None,
            selected_college_name: None,
            coe_status: CoeStatus::default(),
            visa_status: VisaStatus::default(),
            admission_status: AdmissionStatus::default(),
            course_status: CourseStatus::default(),
            interview_status: InterviewStatus::default(),
            payment_received: 0,
            payment_received_date: None,
            payment_remaining: 0,
            expected_month_of_payment: None,
            remarks: None,
            eligible_for_income_bonus: false,
            coe_bonus_stage: CoeBonusStage::None,
            income: 0,
            class_id: None,
            profile_image: None,
            academic_records: Vec::new(),
            family_members: Vec::new(),
            work_experiences: Vec::new(),
            documents: Vec::new(),
        };
        self.apply_to(&mut student);
        student
    }

    /// Overlays present fields onto `student`, leaving the rest untouched.
    /// COE status, income, and the bonus stage are not written here.
    pub fn apply_to(self, student: &mut Student) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut student.first_name, self.first_name);
        set(&mut student.last_name, self.last_name);
        set_opt(&mut student.phone, self.phone);
        set_opt(&mut student.sex, self.sex);
        set_opt(&mut student.dob, self.dob);
        set_opt(&mut student.pob, self.pob);
        set_opt(&mut student.email, self.email);
        set_opt(&mut student.curr_add, self.curr_add);
        set_opt(&mut student.temp_add, self.temp_add);
        set_opt(&mut student.per_add, self.per_add);
        set_opt(&mut student.pass_num, self.pass_num);
        set_opt(&mut student.pass_doi, self.pass_doi);
        set_opt(&mut student.pass_doe, self.pass_doe);
        set_opt(
            &mut student.consultancy_admission_date,
            self.consultancy_admission_date,
        );
        set_opt(&mut student.selected_college_name, self.selected_college_name);
        set(&mut student.visa_status, self.visa_status);
        set(&mut student.admission_status, self.admission_status);
        set(&mut student.course_status, self.course_status);
        set(&mut student.interview_status, self.interview_status);
        set(&mut student.payment_received, self.payment_received);
        set_opt(&mut student.payment_received_date, self.payment_received_date);
        set(&mut student.payment_remaining, self.payment_remaining);
        set_opt(
            &mut student.expected_month_of_payment,
            self.expected_month_of_payment,
        );
        set_opt(&mut student.remarks, self.remarks);
        set(&mut student.eligible_for_income_bonus, self.eligible_for_income_bonus);
        set(&mut student.class_id, self.class_id);
        set(&mut student.academic_records, self.academic_records);
        set(&mut student.family_members, self.family_members);
        set(&mut student.work_experiences, self.work_experiences);
        set(&mut student.documents, self.documents);
    }
}

/// Compact student reference used when populating classes and sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "COEStatus")]
    pub coe_status: CoeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRef {
    pub id: ClassId,
    pub name: String,
}

/// Student with its class reference populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(flatten)]
    pub student: Student,
    pub class: Option<ClassRef>,
}

/// Class with its member ids populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassView {
    pub id: ClassId,
    pub name: String,
    pub students: Vec<StudentSummary>,
}

/// Name search hit; `id` is `null` for the "Not found" placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: Option<StudentId>,
    pub name: String,
}

impl SearchHit {
    pub fn not_found() -> Self {
        Self {
            id: None,
            name: "Not found".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewClass {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignment {
    #[serde(default)]
    pub student_id: Option<StudentId>,
}
