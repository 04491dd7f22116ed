use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::domain::{EntryId, LedgerEntry, LedgerInput, LedgerKind};
use super::repository::LedgerRepository;
use crate::dates::DateRange;
use crate::error::ValidationError;
use crate::store::{next_id, RepositoryError};

/// Records and lists entries of one ledger collection.
pub struct LedgerService<L> {
    repository: Arc<L>,
    kind: LedgerKind,
}

impl<L> LedgerService<L>
where
    L: LedgerRepository + 'static,
{
    pub fn new(repository: Arc<L>, kind: LedgerKind) -> Self {
        Self { repository, kind }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    /// Validates and stores a new entry. `today` fills in a missing date where allowed.
    pub fn record(
        &self,
        input: LedgerInput,
        today: NaiveDate,
    ) -> Result<LedgerEntry, LedgerError> {
        let date = match (input.date, self.kind.requires_date()) {
            (Some(date), _) => Some(date),
            (None, true) => None,
            (None, false) => Some(today),
        };
        let (Some(amount), Some(date)) = (input.amount, date) else {
            return Err(if self.kind.requires_date() {
                ValidationError::MissingFields {
                    fields: "amount and date",
                }
            } else {
                ValidationError::MissingField("amount")
            }
            .into());
        };
        if amount < 0 {
            return Err(ValidationError::Malformed {
                field: "amount",
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        let entry = self.repository.insert(LedgerEntry {
            id: EntryId(next_id(self.kind.id_prefix())),
            amount,
            date,
            remark: input.remark.unwrap_or_default(),
        })?;
        info!(
            ledger = self.kind.label(),
            entry = %entry.id,
            amount = entry.amount,
            date = %entry.date,
            "ledger entry recorded"
        );
        Ok(entry)
    }

    pub fn list(&self, range: &DateRange) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.repository.list(range)?)
    }

    pub fn delete(&self, id: &EntryId) -> Result<(), LedgerError> {
        if !self.repository.delete(id)? {
            return Err(LedgerError::NotFound {
                kind: self.kind,
                id: id.clone(),
            });
        }
        info!(ledger = self.kind.label(), entry = %id, "ledger entry deleted");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{} {id} not found", .kind.label())]
    NotFound { kind: LedgerKind, id: EntryId },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
