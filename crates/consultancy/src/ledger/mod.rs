//! Payments and custom income: dated amounts kept apart from student records.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{total, EntryId, LedgerEntry, LedgerInput, LedgerKind};
pub use repository::LedgerRepository;
pub use router::ledger_router;
pub use service::{LedgerError, LedgerService};
