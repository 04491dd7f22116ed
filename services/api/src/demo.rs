use crate::infra::{open_store, Services};
use chrono::{Local, NaiveDate};
use clap::Args;
use consultancy::admissions::{EnumPolicy, NewClass, StatusField, Student};
use consultancy::config::AppConfig;
use consultancy::dates::{parse_date, DateRange};
use consultancy::error::AppError;
use consultancy::ledger::LedgerInput;
use consultancy::reporting::{IncomeRates, RateOverrides, ReportSummary};
use consultancy::store::InMemoryStore;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct ReportSummaryArgs {
    /// Store snapshot to read (defaults to APP_DATA_FILE)
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
    /// Only count payments dated on or after this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Only count payments dated on or before this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    /// Flat income for a student eligible for the enrolment bonus
    #[arg(long)]
    pub(crate) new_student_income: Option<i64>,
    /// Flat income for a student whose COE was applied
    #[arg(long)]
    pub(crate) coe_applied_income: Option<i64>,
    /// Additional flat income once the COE is received
    #[arg(long)]
    pub(crate) coe_received_income: Option<i64>,
    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Booking date for the sample payments (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_report_summary(args: ReportSummaryArgs) -> Result<(), AppError> {
    let ReportSummaryArgs {
        data_file,
        from,
        to,
        new_student_income,
        coe_applied_income,
        coe_received_income,
        json,
    } = args;

    let config = AppConfig::load()?;
    let data_file = data_file.or(config.storage.data_file);
    if data_file.is_none() {
        println!("No data file configured; reporting over an empty store.");
    }
    let store = open_store(data_file.as_deref())?;
    let services = Services::new(&store, config.enum_policy, config.income_rates);

    let overrides = RateOverrides {
        new_student_income,
        coe_applied_income,
        coe_received_income,
    };
    let rates = match overrides.resolve(&config.income_rates) {
        Ok(rates) => rates,
        Err(err) => {
            println!("Summary unavailable: {err}");
            return Ok(());
        }
    };
    let range = DateRange { from, to };
    let summary = match services.reporting.summary(&range, &overrides) {
        Ok(summary) => summary,
        Err(err) => {
            println!("Summary unavailable: {err}");
            return Ok(());
        }
    };

    if json {
        let rendered = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_summary(&summary, &range, &rates);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let store = InMemoryStore::new();
    let rates = IncomeRates::default();
    let services = Services::new(&store, EnumPolicy::Substitute, rates);

    println!("Consultancy back office demo");
    if let Err(err) = walk_workflows(&services, today) {
        println!("  Demo aborted: {err}");
        return Ok(());
    }

    match services
        .reporting
        .summary(&DateRange::unbounded(), &RateOverrides::default())
    {
        Ok(summary) => render_summary(&summary, &DateRange::unbounded(), &rates),
        Err(err) => println!("  Summary unavailable: {err}"),
    }
    Ok(())
}

fn walk_workflows(services: &Services, today: NaiveDate) -> Result<(), Box<dyn Error>> {
    let admissions = &services.admissions;
    let ielts = admissions.create_class(NewClass {
        name: Some("IELTS Morning".to_string()),
    })?;
    let pte = admissions.create_class(NewClass {
        name: Some("PTE Evening".to_string()),
    })?;
    println!("- Classes: {} ({}), {} ({})", ielts.name, ielts.id, pte.name, pte.id);

    let asha = admissions.create(json!({
        "firstName": "Asha",
        "lastName": "Gurung",
        "phone": "9800000001",
        "eligibleForIncomeBonus": true,
        "classId": ielts.id,
        "paymentReceived": 15000,
        "paymentReceivedDate": today.to_string(),
    }))?;
    let bina = admissions.create(json!({
        "firstName": "Bina",
        "lastName": "Shrestha",
        "COEStatus": "Applied",
        "visaStatus": "Applied",
        "classId": ielts.id,
    }))?;
    let chandra = admissions.create(json!({
        "firstName": "Chandra",
        "lastName": "Rai",
        "COEStatus": "Unknown",
    }))?;
    for student in [&asha, &bina, &chandra] {
        describe(student, "enrolled");
    }

    println!("\nCOE progression for {}", asha.full_name());
    for status in ["Applied", "Received", "Applied"] {
        let updated = admissions.update(&asha.id, json!({ "COEStatus": status }))?;
        describe(&updated, "updated");
    }

    println!("\nClass move for {}", bina.full_name());
    let moved = admissions.update(&bina.id, json!({ "classId": pte.id }))?;
    for class in admissions.list_classes()? {
        println!("  - {}: {} member(s)", class.name, class.students.len());
    }
    describe(&moved, "moved");

    let payment = services.payments.record(
        LedgerInput {
            amount: Some(5000),
            date: Some(today),
            remark: Some("Bina first instalment".to_string()),
        },
        today,
    )?;
    let income = services.custom_incomes.record(
        LedgerInput {
            amount: Some(1200),
            date: None,
            remark: Some("Document translation".to_string()),
        },
        today,
    )?;
    println!(
        "\nLedgers: payment {} of {} on {}, custom income {} of {} on {}",
        payment.id, payment.amount, payment.date, income.id, income.amount, income.date
    );
    Ok(())
}

fn describe(student: &Student, action: &str) {
    println!(
        "  - {} {}: COE {} | visa {} | bonus stage {:?} | income {}",
        student.full_name(),
        action,
        student.coe_status.label(),
        student.visa_status.label(),
        student.coe_bonus_stage,
        student.income
    );
}

fn render_summary(summary: &ReportSummary, range: &DateRange, rates: &IncomeRates) {
    let window = match (range.from, range.to) {
        (None, None) => "all time".to_string(),
        (from, to) => format!(
            "{} to {}",
            from.map_or_else(|| "start".to_string(), |date| date.to_string()),
            to.map_or_else(|| "today".to_string(), |date| date.to_string())
        ),
    };
    println!("\nReporting summary ({window})");
    println!(
        "- Rates: new student {} | COE applied {} | COE received {}",
        rates.new_student, rates.coe_applied, rates.coe_received
    );
    println!(
        "- {} students | COE pending {} / applied {} / received {}",
        summary.total_students, summary.pending_coe, summary.applied_coe, summary.received_coe
    );
    println!(
        "- Income {} | payments received {} | due {}",
        summary.total_income, summary.total_payments_received, summary.payment_due
    );
    println!("- Custom income {}", summary.total_custom_income);
}
