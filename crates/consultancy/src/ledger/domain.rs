use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::deserialize_optional_date;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two append-only income collections. They share one record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Payment,
    CustomIncome,
}

impl LedgerKind {
    pub const fn id_prefix(self) -> &'static str {
        match self {
            LedgerKind::Payment => "pay",
            LedgerKind::CustomIncome => "inc",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LedgerKind::Payment => "payment",
            LedgerKind::CustomIncome => "custom income",
        }
    }

    /// Payments must carry a date; custom income defaults to the day it is booked.
    pub const fn requires_date(self) -> bool {
        matches!(self, LedgerKind::Payment)
    }
}

/// Income received outside the per-student payment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub amount: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub remark: String,
}

/// Request body for a new entry; `remarks` is accepted as an alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LedgerInput {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "remarks")]
    pub remark: Option<String>,
}

/// Sum of `amount` over the given entries, `None` once it leaves the `i64` range.
pub fn total<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Option<i64> {
    entries
        .into_iter()
        .try_fold(0i64, |sum, entry| sum.checked_add(entry.amount))
}
