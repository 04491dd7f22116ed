//! Persistence ports shared by every collection, plus the bundled adapter.

mod memory;
mod snapshot;

pub use memory::{InMemoryStore, MemoryLedger};

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Opaque record id: `<prefix>-<unix millis, hex>-<process sequence>`.
pub fn next_id(prefix: &str) -> String {
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{prefix}-{:011x}-{sequence:04}",
        Utc::now().timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let first = next_id("stu");
        let second = next_id("stu");
        assert!(first.starts_with("stu-"));
        assert_ne!(first, second);
    }
}
