use super::common::*;
use serde_json::json;

use crate::admissions::{
    ClassAssignment, CoeBonusStage, CoeStatus, CourseStatus, EnumPolicy, StudentId,
    StudentRepository, StudentServiceError, VisaStatus,
};
use crate::error::ValidationError;

#[test]
fn create_requires_first_name() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let err = service
        .create(json!({ "lastName": "Rai" }))
        .expect_err("first name required");
    assert!(matches!(
        err,
        StudentServiceError::Validation(ValidationError::MissingField("firstName"))
    ));

    let err = service
        .create(json!({ "firstName": "   " }))
        .expect_err("blank first name rejected");
    assert!(matches!(err, StudentServiceError::Validation(_)));
}

#[test]
fn create_books_base_income_and_coe_bonus() {
    let (service, _) = build_service(EnumPolicy::Substitute);

    let plain = service
        .create(student_payload("Bina", json!({})))
        .expect("created");
    assert_eq!(plain.income, 0);
    assert_eq!(plain.coe_bonus_stage, CoeBonusStage::None);

    let eligible = service
        .create(student_payload(
            "Asha",
            json!({ "eligibleForIncomeBonus": true, "COEStatus": "Received" }),
        ))
        .expect("created");
    assert_eq!(eligible.income, 2000 + 15000);
    assert_eq!(eligible.coe_bonus_stage, CoeBonusStage::Received);
    assert_eq!(eligible.coe_status, CoeStatus::Received);
}

#[test]
fn client_supplied_income_and_bonus_stage_are_ignored() {
    let (service, store) = build_service(EnumPolicy::Substitute);
    let forged = json!({
        "eligibleForIncomeBonus": true,
        "income": 999999,
        "coeBonusStage": "Received",
    });

    let created = service
        .create(student_payload("Asha", forged.clone()))
        .expect("created");
    assert_eq!(created.income, 2000);
    assert_eq!(created.coe_bonus_stage, CoeBonusStage::None);

    let updated = service
        .update(&created.id, student_payload("Asha", forged))
        .expect("updated");
    assert_eq!(updated.income, 2000);
    assert_eq!(updated.coe_bonus_stage, CoeBonusStage::None);

    let stored = StudentRepository::fetch(&store, &created.id)
        .expect("fetch works")
        .expect("student present");
    assert_eq!(stored.income, 2000);
    assert_eq!(stored.coe_bonus_stage, CoeBonusStage::None);
}

#[test]
fn coe_updates_walk_the_bonus_table() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let student = service
        .create(student_payload("Asha", json!({ "eligibleForIncomeBonus": true })))
        .expect("created");
    assert_eq!(student.income, 2000);

    let steps = [
        ("Applied", 7000, CoeBonusStage::Applied),
        ("Applied", 7000, CoeBonusStage::Applied),
        ("Received", 17000, CoeBonusStage::Received),
        ("Applied", 7000, CoeBonusStage::Applied),
        ("Pending", 2000, CoeBonusStage::None),
        ("Pending", 2000, CoeBonusStage::None),
    ];
    for (requested, income, stage) in steps {
        let updated = service
            .update(&student.id, json!({ "COEStatus": requested }))
            .expect("updated");
        assert_eq!(updated.income, income, "after requesting {requested}");
        assert_eq!(updated.coe_bonus_stage, stage, "after requesting {requested}");
    }
}

#[test]
fn updates_without_coe_status_leave_income_alone() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let student = service
        .create(student_payload("Asha", json!({ "COEStatus": "Applied" })))
        .expect("created");
    assert_eq!(student.income, 5000);

    let updated = service
        .update(&student.id, json!({ "remarks": "called about visa" }))
        .expect("updated");
    assert_eq!(updated.income, 5000);
    assert_eq!(updated.coe_status, CoeStatus::Applied);
    assert_eq!(updated.remarks.as_deref(), Some("called about visa"));
    assert_eq!(updated.phone.as_deref(), Some("9800000000"));
}

#[test]
fn eligibility_toggle_moves_base_income() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let student = service
        .create(student_payload("Asha", json!({ "COEStatus": "Applied" })))
        .expect("created");

    let on = service
        .update(&student.id, json!({ "eligibleForIncomeBonus": true }))
        .expect("updated");
    assert_eq!(on.income, 7000);

    let off = service
        .update(&student.id, json!({ "eligibleForIncomeBonus": false }))
        .expect("updated");
    assert_eq!(off.income, 5000);
}

#[test]
fn invalid_statuses_are_substituted_by_default() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let student = service
        .create(student_payload(
            "Asha",
            json!({
                "COEStatus": "Approved",
                "visaStatus": "Maybe",
                "courseStatus": "Ongoing",
            }),
        ))
        .expect("created");
    assert_eq!(student.coe_status, CoeStatus::Pending);
    assert_eq!(student.visa_status, VisaStatus::NotApplied);
    assert_eq!(student.course_status, CourseStatus::Ongoing);
    assert_eq!(student.income, 0);
}

#[test]
fn strict_policy_rejects_invalid_statuses() {
    let (service, store) = build_service(EnumPolicy::Strict);
    let err = service
        .create(student_payload("Asha", json!({ "COEStatus": "Approved" })))
        .expect_err("strict policy rejects");
    assert!(matches!(err, StudentServiceError::Normalization(_)));
    assert!(StudentRepository::list(&store).expect("list").is_empty());
}

#[test]
fn create_rejects_unknown_class() {
    let (service, store) = build_service(EnumPolicy::Substitute);
    let err = service
        .create(student_payload("Asha", json!({ "classId": "cls-missing" })))
        .expect_err("unknown class");
    assert!(matches!(
        err,
        StudentServiceError::NotFound { entity: "Class", .. }
    ));
    assert!(StudentRepository::list(&store).expect("list").is_empty());
}

#[test]
fn missing_records_are_not_found() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let ghost = StudentId("stu-ghost".to_string());
    assert!(matches!(
        service.update(&ghost, json!({ "remarks": "x" })),
        Err(StudentServiceError::NotFound { entity: "Student", .. })
    ));
    assert!(matches!(
        service.delete(&ghost),
        Err(StudentServiceError::NotFound { .. })
    ));
}

#[test]
fn search_returns_placeholder_when_nothing_matches() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    service
        .create(student_payload("Asha", json!({})))
        .expect("created");

    let hits = service.search(Some("ash")).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Asha Shrestha");
    assert!(hits[0].id.is_some());

    for query in [None, Some(""), Some("zzz")] {
        let hits = service.search(query).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Not found");
        assert!(hits[0].id.is_none());
    }
}

#[test]
fn list_populates_class_names() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let class = create_class(&service, "IELTS Morning");
    service
        .create(student_payload("Asha", json!({ "classId": class.0 })))
        .expect("created");
    service
        .create(student_payload("Bina", json!({})))
        .expect("created");

    let mut views = service.list().expect("list");
    views.sort_by(|a, b| a.student.first_name.cmp(&b.student.first_name));
    assert_eq!(
        views[0].class.as_ref().map(|class| class.name.as_str()),
        Some("IELTS Morning")
    );
    assert!(views[1].class.is_none());
}

#[test]
fn assign_rejects_missing_student_id() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let class = create_class(&service, "PTE");
    let err = service
        .assign(&class, ClassAssignment { student_id: None })
        .expect_err("student id required");
    assert!(matches!(
        err,
        StudentServiceError::Validation(ValidationError::MissingField("studentId"))
    ));
}

#[test]
fn create_class_requires_name() {
    let (service, _) = build_service(EnumPolicy::Substitute);
    let err = service
        .create_class(crate::admissions::NewClass {
            name: Some("  ".to_string()),
        })
        .expect_err("name required");
    assert!(matches!(err, StudentServiceError::Validation(_)));
}
