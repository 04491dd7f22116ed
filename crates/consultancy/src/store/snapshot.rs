use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RepositoryError;
use crate::admissions::{Class, ClassId, Student, StudentId};
use crate::attendance::AttendanceStatus;
use crate::ledger::{EntryId, LedgerEntry};

/// Everything the in-memory store holds, in its on-disk JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct StoreState {
    #[serde(default)]
    pub(super) students: BTreeMap<StudentId, Student>,
    #[serde(default)]
    pub(super) classes: BTreeMap<ClassId, Class>,
    #[serde(default)]
    pub(super) payments: BTreeMap<EntryId, LedgerEntry>,
    #[serde(default)]
    pub(super) custom_incomes: BTreeMap<EntryId, LedgerEntry>,
    #[serde(default)]
    pub(super) attendance: BTreeMap<StudentId, BTreeMap<NaiveDate, AttendanceStatus>>,
}

pub(super) fn load(path: &Path) -> Result<StoreState, RepositoryError> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let raw = fs::read(path).map_err(|err| unavailable(path, err))?;
    serde_json::from_slice(&raw).map_err(|err| unavailable(path, err))
}

/// Writes beside the target, then renames over it.
pub(super) fn save(path: &Path, state: &StoreState) -> Result<(), RepositoryError> {
    let encoded = serde_json::to_vec_pretty(state).map_err(|err| unavailable(path, err))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| unavailable(path, err))?;
    }
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, encoded).map_err(|err| unavailable(path, err))?;
    fs::rename(&staging, path).map_err(|err| unavailable(path, err))
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("snapshot {}: {err}", path.display()))
}
