use std::sync::Arc;

use chrono::NaiveDate;
use consultancy::admissions::{AdmissionsService, EnumPolicy, NewClass};
use consultancy::dates::DateRange;
use consultancy::ledger::{LedgerError, LedgerInput, LedgerKind, LedgerService};
use consultancy::reporting::{IncomeRates, RateOverrides, ReportingService};
use consultancy::store::{InMemoryStore, MemoryLedger};
use serde_json::json;

struct Office {
    admissions: AdmissionsService<InMemoryStore, InMemoryStore>,
    payments: LedgerService<MemoryLedger>,
    custom_incomes: LedgerService<MemoryLedger>,
    reporting: ReportingService<InMemoryStore, InMemoryStore, MemoryLedger>,
}

fn office() -> Office {
    let store = InMemoryStore::new();
    let shared = Arc::new(store.clone());
    let payments = Arc::new(store.payments());
    let custom_incomes = Arc::new(store.custom_incomes());
    Office {
        admissions: AdmissionsService::new(
            shared.clone(),
            shared.clone(),
            EnumPolicy::Substitute,
        ),
        payments: LedgerService::new(payments.clone(), LedgerKind::Payment),
        custom_incomes: LedgerService::new(custom_incomes.clone(), LedgerKind::CustomIncome),
        reporting: ReportingService::new(
            shared.clone(),
            shared,
            payments,
            custom_incomes,
            IncomeRates::default(),
        ),
    }
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

fn entry(amount: i64, date: Option<NaiveDate>, remark: &str) -> LedgerInput {
    LedgerInput {
        amount: Some(amount),
        date,
        remark: Some(remark.to_string()),
    }
}

#[test]
fn monthly_summary_counts_only_payments_in_window() {
    let office = office();
    office
        .admissions
        .create(json!({
            "firstName": "Asha",
            "eligibleForIncomeBonus": true,
            "COEStatus": "Received",
            "paymentReceived": 4000,
            "paymentReceivedDate": "2025-06-28",
        }))
        .expect("student");
    office
        .admissions
        .create(json!({ "firstName": "Bina", "COEStatus": "Applied" }))
        .expect("student");

    for (amount, date) in [(1000, day(7, 4)), (2500, day(7, 20)), (900, day(8, 2))] {
        office
            .payments
            .record(entry(amount, Some(date), "instalment"), date)
            .expect("payment");
    }
    office
        .custom_incomes
        .record(entry(1200, None, "translation"), day(7, 9))
        .expect("custom income");

    let july = DateRange::between(day(7, 1), day(7, 31));
    let summary = office
        .reporting
        .summary(&july, &RateOverrides::default())
        .expect("summary");
    assert_eq!(summary.total_students, 2);
    assert_eq!(summary.total_income, 22000);
    assert_eq!(summary.total_payments_received, 3500);
    assert_eq!(summary.payment_due, 18500);
    assert_eq!(summary.total_custom_income, 1200);
    assert_eq!((summary.pending_coe, summary.applied_coe, summary.received_coe), (0, 1, 1));

    let everything = office
        .reporting
        .summary(&DateRange::unbounded(), &RateOverrides::default())
        .expect("summary");
    assert_eq!(everything.total_payments_received, 4000 + 1000 + 2500 + 900);

    let generous = RateOverrides {
        coe_received_income: Some(20000),
        ..RateOverrides::default()
    };
    let summary = office.reporting.summary(&july, &generous).expect("summary");
    assert_eq!(summary.total_income, 32000);
}

#[test]
fn ledgers_list_newest_first_and_delete_by_id() {
    let office = office();
    let older = office
        .payments
        .record(entry(1000, Some(day(7, 1)), "deposit"), day(7, 1))
        .expect("payment");
    let newer = office
        .payments
        .record(entry(2000, Some(day(7, 15)), "tuition"), day(7, 15))
        .expect("payment");

    let listed = office.payments.list(&DateRange::unbounded()).expect("list");
    let ids: Vec<_> = listed.iter().map(|entry| entry.id.clone()).collect();
    assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);

    office.payments.delete(&older.id).expect("deleted");
    assert!(matches!(
        office.payments.delete(&older.id),
        Err(LedgerError::NotFound { .. })
    ));
    assert_eq!(
        office.payments.list(&DateRange::unbounded()).expect("list").len(),
        1
    );
    assert!(office
        .custom_incomes
        .list(&DateRange::unbounded())
        .expect("list")
        .is_empty());
}

#[test]
fn export_names_each_student_class() {
    let office = office();
    let class = office
        .admissions
        .create_class(NewClass {
            name: Some("IELTS Morning".to_string()),
        })
        .expect("class");
    office
        .admissions
        .create(json!({
            "firstName": "Asha",
            "lastName": "Gurung",
            "phone": "9800000001",
            "classId": class.id,
            "COEStatus": "Applied",
        }))
        .expect("student");
    office
        .admissions
        .create(json!({ "firstName": "Bina" }))
        .expect("student");

    let csv = String::from_utf8(office.reporting.export().expect("export")).expect("utf8");
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("ID,Name,Phone,Class"));
    assert!(rows
        .iter()
        .any(|row| row.contains("Asha Gurung,9800000001,IELTS Morning,Applied,5000")));
    assert!(rows.iter().any(|row| row.contains("Bina,,,Pending,0")));
}
