use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::export::roster_csv;
use super::{
    calculate, summarize, AmountOverflow, IncomeCalculation, IncomeRates, RateOverrides,
    ReportSummary,
};
use crate::admissions::{ClassRepository, StudentRepository};
use crate::dates::DateRange;
use crate::error::ValidationError;
use crate::ledger::LedgerRepository;
use crate::store::RepositoryError;

/// Read-only reporting over students, classes, and both ledgers.
pub struct ReportingService<S, C, L> {
    students: Arc<S>,
    classes: Arc<C>,
    payments: Arc<L>,
    custom_incomes: Arc<L>,
    rates: IncomeRates,
}

impl<S, C, L> ReportingService<S, C, L>
where
    S: StudentRepository + 'static,
    C: ClassRepository + 'static,
    L: LedgerRepository + 'static,
{
    pub fn new(
        students: Arc<S>,
        classes: Arc<C>,
        payments: Arc<L>,
        custom_incomes: Arc<L>,
        rates: IncomeRates,
    ) -> Self {
        Self {
            students,
            classes,
            payments,
            custom_incomes,
            rates,
        }
    }

    pub fn rates(&self) -> IncomeRates {
        self.rates
    }

    pub fn summary(
        &self,
        range: &DateRange,
        overrides: &RateOverrides,
    ) -> Result<ReportSummary, ReportingError> {
        let rates = overrides.resolve(&self.rates)?;
        let students = self.students.list()?;
        let payments = self.payments.list(range)?;
        let custom_incomes = self.custom_incomes.list(range)?;

        let summary = summarize(&students, &payments, &custom_incomes, range, &rates)?;
        debug!(
            students = summary.total_students,
            income = summary.total_income,
            received = summary.total_payments_received,
            "summary computed"
        );
        Ok(summary)
    }

    pub fn calculation(
        &self,
        overrides: &RateOverrides,
    ) -> Result<IncomeCalculation, ReportingError> {
        let rates = overrides.resolve(&self.rates)?;
        Ok(calculate(&self.students.list()?, &rates)?)
    }

    /// CSV roster of every student with its class name.
    pub fn export(&self) -> Result<Vec<u8>, ReportingError> {
        let class_names: HashMap<_, _> = self
            .classes
            .list()?
            .into_iter()
            .map(|class| (class.id, class.name))
            .collect();
        Ok(roster_csv(&self.students.list()?, &class_names)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Overflow(#[from] AmountOverflow),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to write export: {0}")]
    Export(#[from] csv::Error),
}
