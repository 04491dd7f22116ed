//! Dashboard figures derived from students and the payment ledgers.
//!
//! The income here is a flat classification over current COE status and is
//! recomputed on every request. It never touches the persisted `income` field,
//! which is owned by [`crate::admissions::income`].

pub mod export;
mod router;
mod service;

pub use router::reporting_router;
pub use service::{ReportingError, ReportingService};

use serde::{Deserialize, Serialize};

use crate::admissions::{CoeStatus, Student, StudentId};
use crate::dates::DateRange;
use crate::error::ValidationError;
use crate::ledger::{self, LedgerEntry};

/// A report figure whose exact value does not fit in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} exceeds the supported amount range")]
pub struct AmountOverflow(pub &'static str);

fn checked_sum(
    values: impl IntoIterator<Item = Result<i64, AmountOverflow>>,
    figure: &'static str,
) -> Result<i64, AmountOverflow> {
    values.into_iter().try_fold(0i64, |sum, value| {
        sum.checked_add(value?).ok_or(AmountOverflow(figure))
    })
}

/// Flat per-student rates used by the reporting calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRates {
    pub new_student: i64,
    pub coe_applied: i64,
    pub coe_received: i64,
}

impl Default for IncomeRates {
    fn default() -> Self {
        Self {
            new_student: 2000,
            coe_applied: 5000,
            coe_received: 10000,
        }
    }
}

/// Per-request rate overrides; unset values fall back to the configured rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOverrides {
    pub new_student_income: Option<i64>,
    pub coe_applied_income: Option<i64>,
    pub coe_received_income: Option<i64>,
}

impl RateOverrides {
    /// Negative overrides are rejected.
    pub fn resolve(&self, defaults: &IncomeRates) -> Result<IncomeRates, ValidationError> {
        let pick = |value: Option<i64>, fallback: i64, field: &'static str| match value {
            Some(rate) if rate < 0 => Err(ValidationError::Malformed {
                field,
                reason: "must not be negative".to_string(),
            }),
            Some(rate) => Ok(rate),
            None => Ok(fallback),
        };
        Ok(IncomeRates {
            new_student: pick(
                self.new_student_income,
                defaults.new_student,
                "newStudentIncome",
            )?,
            coe_applied: pick(
                self.coe_applied_income,
                defaults.coe_applied,
                "coeAppliedIncome",
            )?,
            coe_received: pick(
                self.coe_received_income,
                defaults.coe_received,
                "coeReceivedIncome",
            )?,
        })
    }
}

/// Income a student contributes under the flat reporting rates.
pub fn flat_income(student: &Student, rates: &IncomeRates) -> Result<i64, AmountOverflow> {
    let applied = matches!(student.coe_status, CoeStatus::Applied | CoeStatus::Received);
    let received = student.coe_status == CoeStatus::Received;
    let earned = [
        (student.eligible_for_income_bonus, rates.new_student),
        (applied, rates.coe_applied),
        (received, rates.coe_received),
    ];
    checked_sum(
        earned
            .into_iter()
            .filter(|(applies, _)| *applies)
            .map(|(_, rate)| Ok(rate)),
        "student income",
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIncome {
    pub id: StudentId,
    pub name: String,
    #[serde(rename = "COEStatus")]
    pub coe_status: CoeStatus,
    pub eligible_for_income_bonus: bool,
    pub income: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeCalculation {
    pub rates: IncomeRates,
    pub students: Vec<StudentIncome>,
    pub total_income: i64,
}

pub fn calculate(
    students: &[Student],
    rates: &IncomeRates,
) -> Result<IncomeCalculation, AmountOverflow> {
    let students = students
        .iter()
        .map(|student| {
            Ok(StudentIncome {
                id: student.id.clone(),
                name: student.full_name(),
                coe_status: student.coe_status,
                eligible_for_income_bonus: student.eligible_for_income_bonus,
                income: flat_income(student, rates)?,
            })
        })
        .collect::<Result<Vec<_>, AmountOverflow>>()?;
    let total_income = checked_sum(students.iter().map(|row| Ok(row.income)), "total income")?;
    Ok(IncomeCalculation {
        rates: *rates,
        students,
        total_income,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_students: usize,
    pub total_payments_received: i64,
    pub total_income: i64,
    pub payment_due: i64,
    pub pending_coe: usize,
    pub applied_coe: usize,
    pub received_coe: usize,
    pub total_custom_income: i64,
}

/// Folds students and ledger entries into the dashboard summary.
///
/// `range` only narrows payments: a student's own payment counts when its
/// received date is inside the window (undated ones only for an open window),
/// and ledger entries count when dated inside it. Student counts and income
/// always cover every student. Totals that overflow `i64` are an error.
pub fn summarize(
    students: &[Student],
    payments: &[LedgerEntry],
    custom_incomes: &[LedgerEntry],
    range: &DateRange,
    rates: &IncomeRates,
) -> Result<ReportSummary, AmountOverflow> {
    let student_payments = checked_sum(
        students
            .iter()
            .filter(|student| range.contains_optional(student.payment_received_date))
            .map(|student| Ok(student.payment_received)),
        "total payments received",
    )?;
    let total_payments_received = student_payments
        .checked_add(in_range(payments, range, "total payments received")?)
        .ok_or(AmountOverflow("total payments received"))?;
    let total_income = checked_sum(
        students.iter().map(|student| flat_income(student, rates)),
        "total income",
    )?;
    let payment_due = total_income
        .checked_sub(total_payments_received)
        .ok_or(AmountOverflow("payment due"))?;

    let count = |status: CoeStatus| {
        students
            .iter()
            .filter(|student| student.coe_status == status)
            .count()
    };

    Ok(ReportSummary {
        total_students: students.len(),
        total_payments_received,
        total_income,
        payment_due,
        pending_coe: count(CoeStatus::Pending),
        applied_coe: count(CoeStatus::Applied),
        received_coe: count(CoeStatus::Received),
        total_custom_income: in_range(custom_incomes, range, "total custom income")?,
    })
}

fn in_range(
    entries: &[LedgerEntry],
    range: &DateRange,
    figure: &'static str,
) -> Result<i64, AmountOverflow> {
    ledger::total(entries.iter().filter(|entry| range.contains(entry.date)))
        .ok_or(AmountOverflow(figure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::StudentInput;
    use crate::ledger::EntryId;
    use chrono::NaiveDate;

    fn student(id: &str, eligible: bool, coe: CoeStatus) -> Student {
        let mut student = StudentInput {
            first_name: Some(id.to_string()),
            eligible_for_income_bonus: Some(eligible),
            ..StudentInput::default()
        }
        .into_student(StudentId(id.to_string()));
        student.coe_status = coe;
        student
    }

    fn entry(id: &str, amount: i64, date: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            id: EntryId(id.to_string()),
            amount,
            date,
            remark: String::new(),
        }
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
    }

    #[test]
    fn flat_income_stacks_rates_by_status() {
        let rates = IncomeRates::default();
        let students = [
            student("a", true, CoeStatus::Received),
            student("b", false, CoeStatus::Applied),
        ];
        assert_eq!(flat_income(&students[0], &rates), Ok(17000));
        assert_eq!(flat_income(&students[1], &rates), Ok(5000));
        assert_eq!(
            calculate(&students, &rates).map(|calc| calc.total_income),
            Ok(22000)
        );
        assert_eq!(flat_income(&student("c", false, CoeStatus::Pending), &rates), Ok(0));
    }

    #[test]
    fn flat_income_ignores_persisted_income() {
        let mut received = student("a", true, CoeStatus::Received);
        received.income = 123;
        assert_eq!(flat_income(&received, &IncomeRates::default()), Ok(17000));
    }

    #[test]
    fn overrides_replace_only_given_rates() {
        let overrides = RateOverrides {
            coe_received_income: Some(12000),
            ..RateOverrides::default()
        };
        let rates = overrides.resolve(&IncomeRates::default()).expect("valid rates");
        assert_eq!(rates.new_student, 2000);
        assert_eq!(rates.coe_applied, 5000);
        assert_eq!(rates.coe_received, 12000);
    }

    #[test]
    fn negative_overrides_are_rejected() {
        let overrides = RateOverrides {
            coe_applied_income: Some(-1),
            ..RateOverrides::default()
        };
        assert!(matches!(
            overrides.resolve(&IncomeRates::default()),
            Err(ValidationError::Malformed {
                field: "coeAppliedIncome",
                ..
            })
        ));
    }

    #[test]
    fn oversized_totals_are_errors_not_wraps() {
        let huge = IncomeRates {
            new_student: i64::MAX,
            ..IncomeRates::default()
        };
        let received = student("a", true, CoeStatus::Received);
        assert_eq!(
            flat_income(&received, &huge),
            Err(AmountOverflow("student income"))
        );
        let eligible = [
            student("a", true, CoeStatus::Pending),
            student("b", true, CoeStatus::Pending),
        ];
        assert_eq!(
            calculate(&eligible, &huge).map(|calc| calc.total_income),
            Err(AmountOverflow("total income"))
        );

        let mut rich = student("c", false, CoeStatus::Pending);
        rich.payment_received = i64::MAX;
        let mut modest = student("d", false, CoeStatus::Pending);
        modest.payment_received = 1;
        let rates = IncomeRates::default();
        assert_eq!(
            summarize(&[rich.clone(), modest], &[], &[], &DateRange::unbounded(), &rates),
            Err(AmountOverflow("total payments received"))
        );

        let payments = [entry("pay-1", 1, day(7, 4))];
        assert_eq!(
            summarize(&[rich], &payments, &[], &DateRange::unbounded(), &rates),
            Err(AmountOverflow("total payments received"))
        );

        let mut refunded = student("e", false, CoeStatus::Pending);
        refunded.payment_received = i64::MIN;
        assert_eq!(
            summarize(&[refunded], &[], &[], &DateRange::unbounded(), &rates),
            Err(AmountOverflow("payment due"))
        );
    }

    #[test]
    fn summary_of_one_payment_and_one_received_student() {
        let students = [student("a", true, CoeStatus::Received)];
        let payments = [entry("pay-1", 1000, day(7, 4))];
        let range = DateRange::between(day(7, 1), day(7, 31));

        let summary = summarize(&students, &payments, &[], &range, &IncomeRates::default())
            .expect("fits");
        assert_eq!(summary.total_income, 17000);
        assert_eq!(summary.total_payments_received, 1000);
        assert_eq!(summary.payment_due, 16000);
        assert_eq!(summary.received_coe, 1);
        assert_eq!(summary.pending_coe, 0);
    }

    #[test]
    fn range_narrows_payments_only() {
        let mut paid_in_june = student("a", true, CoeStatus::Pending);
        paid_in_june.payment_received = 3000;
        paid_in_june.payment_received_date = Some(day(6, 20));
        let mut paid_in_july = student("b", false, CoeStatus::Applied);
        paid_in_july.payment_received = 4000;
        paid_in_july.payment_received_date = Some(day(7, 2));
        let mut undated = student("c", false, CoeStatus::Pending);
        undated.payment_received = 500;
        let students = [paid_in_june, paid_in_july, undated];
        let payments = [entry("pay-1", 1000, day(7, 4)), entry("pay-2", 700, day(8, 1))];
        let custom = [entry("inc-1", 250, day(7, 9)), entry("inc-2", 90, day(5, 9))];
        let rates = IncomeRates::default();

        let july = summarize(
            &students,
            &payments,
            &custom,
            &DateRange::between(day(7, 1), day(7, 31)),
            &rates,
        )
        .expect("fits");
        assert_eq!(july.total_students, 3);
        assert_eq!(july.total_payments_received, 4000 + 1000);
        assert_eq!(july.total_income, 2000 + 5000);
        assert_eq!(july.total_custom_income, 250);
        assert_eq!(july.pending_coe, 2);

        let all_time = summarize(&students, &payments, &custom, &DateRange::unbounded(), &rates)
            .expect("fits");
        assert_eq!(all_time.total_payments_received, 3000 + 4000 + 500 + 1000 + 700);
        assert_eq!(all_time.payment_due, 7000 - 9200);
        assert_eq!(all_time.total_custom_income, 340);
    }
}
