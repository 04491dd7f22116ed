use super::domain::{EntryId, LedgerEntry};
use crate::dates::DateRange;
use crate::store::RepositoryError;

/// Port over one ledger collection (payments or custom income).
pub trait LedgerRepository: Send + Sync {
    fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, RepositoryError>;
    /// Entries whose date falls in `range`, newest first.
    fn list(&self, range: &DateRange) -> Result<Vec<LedgerEntry>, RepositoryError>;
    /// Returns whether a record was removed.
    fn delete(&self, id: &EntryId) -> Result<bool, RepositoryError>;
}
