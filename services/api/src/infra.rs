use consultancy::admissions::{AdmissionsService, EnumPolicy};
use consultancy::attendance::AttendanceService;
use consultancy::error::AppError;
use consultancy::ledger::{LedgerKind, LedgerService};
use consultancy::reporting::{IncomeRates, ReportingService};
use consultancy::store::{InMemoryStore, MemoryLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Admissions = AdmissionsService<InMemoryStore, InMemoryStore>;
pub(crate) type Ledger = LedgerService<MemoryLedger>;
pub(crate) type Attendance = AttendanceService<InMemoryStore, InMemoryStore, InMemoryStore>;
pub(crate) type Reporting = ReportingService<InMemoryStore, InMemoryStore, MemoryLedger>;

/// Every service the API exposes, wired over one shared store.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) admissions: Arc<Admissions>,
    pub(crate) payments: Arc<Ledger>,
    pub(crate) custom_incomes: Arc<Ledger>,
    pub(crate) attendance: Arc<Attendance>,
    pub(crate) reporting: Arc<Reporting>,
}

impl Services {
    pub(crate) fn new(store: &InMemoryStore, policy: EnumPolicy, rates: IncomeRates) -> Self {
        let shared = Arc::new(store.clone());
        let payments = Arc::new(store.payments());
        let custom_incomes = Arc::new(store.custom_incomes());

        Self {
            admissions: Arc::new(AdmissionsService::new(
                shared.clone(),
                shared.clone(),
                policy,
            )),
            payments: Arc::new(LedgerService::new(payments.clone(), LedgerKind::Payment)),
            custom_incomes: Arc::new(LedgerService::new(
                custom_incomes.clone(),
                LedgerKind::CustomIncome,
            )),
            attendance: Arc::new(AttendanceService::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
            )),
            reporting: Arc::new(ReportingService::new(
                shared.clone(),
                shared,
                payments,
                custom_incomes,
                rates,
            )),
        }
    }
}

/// Snapshot-backed store when a data file is configured, otherwise volatile.
pub(crate) fn open_store(data_file: Option<&Path>) -> Result<InMemoryStore, AppError> {
    match data_file {
        Some(path) => {
            info!(path = %path.display(), "opening store snapshot");
            Ok(InMemoryStore::open(path)?)
        }
        None => Ok(InMemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn services_share_one_store() {
        let store = InMemoryStore::new();
        let services = Services::new(&store, EnumPolicy::Substitute, IncomeRates::default());
        services
            .admissions
            .create(json!({ "firstName": "Asha", "COEStatus": "Applied" }))
            .expect("student");

        let calculation = services
            .reporting
            .calculation(&Default::default())
            .expect("calculation");
        assert_eq!(calculation.students.len(), 1);
        assert_eq!(calculation.total_income, 5000);
    }

    #[test]
    fn missing_data_file_opens_empty_store() {
        let store = open_store(None).expect("store");
        let services = Services::new(&store, EnumPolicy::Strict, IncomeRates::default());
        assert!(services.admissions.list().expect("list").is_empty());
    }
}
