use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::debug;

use super::snapshot::{self, StoreState};
use super::RepositoryError;
use crate::admissions::{
    Class, ClassId, ClassRepository, Student, StudentFilter, StudentId, StudentRepository,
};
use crate::attendance::{AttendanceRecord, AttendanceRepository};
use crate::dates::DateRange;
use crate::ledger::{EntryId, LedgerEntry, LedgerKind, LedgerRepository};

/// Mutex-guarded store implementing every collection port.
///
/// With a snapshot path the whole state is loaded on open and rewritten after
/// each mutation. Each call takes the lock once, so single operations are
/// atomic; sequences of calls are not.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    snapshot: Option<Arc<PathBuf>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store backed by a JSON snapshot, creating it on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let state = snapshot::load(&path)?;
        debug!(
            path = %path.display(),
            students = state.students.len(),
            classes = state.classes.len(),
            "store snapshot loaded"
        );
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot: Some(Arc::new(path)),
        })
    }

    pub fn payments(&self) -> MemoryLedger {
        MemoryLedger {
            store: self.clone(),
            kind: LedgerKind::Payment,
        }
    }

    pub fn custom_incomes(&self) -> MemoryLedger {
        MemoryLedger {
            store: self.clone(),
            kind: LedgerKind::CustomIncome,
        }
    }

    fn read(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    /// Runs `edit` under the lock and persists the result when it succeeds.
    ///
    /// With a snapshot the edit runs on a copy that replaces the live state
    /// only once it is on disk, so a failed save leaves memory untouched.
    fn write<T>(
        &self,
        edit: impl FnOnce(&mut StoreState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.read()?;
        let Some(path) = &self.snapshot else {
            return edit(&mut guard);
        };
        let mut staged = guard.clone();
        let outcome = edit(&mut staged)?;
        snapshot::save(path, &staged)?;
        *guard = staged;
        Ok(outcome)
    }
}

impl StudentRepository for InMemoryStore {
    fn insert(&self, student: Student) -> Result<Student, RepositoryError> {
        self.write(|state| {
            if state.students.contains_key(&student.id) {
                return Err(RepositoryError::Conflict);
            }
            state.students.insert(student.id.clone(), student.clone());
            Ok(student)
        })
    }

    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.read()?.students.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.read()?.students.values().cloned().collect())
    }

    fn find(&self, filter: &StudentFilter) -> Result<Vec<Student>, RepositoryError> {
        let guard = self.read()?;
        let matches = guard
            .students
            .values()
            .filter(|student| filter.matches(student))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matches)
    }

    fn update(&self, student: Student) -> Result<(), RepositoryError> {
        self.write(|state| match state.students.get_mut(&student.id) {
            Some(slot) => {
                *slot = student;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        })
    }

    fn delete(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.write(|state| {
            let removed = state.students.remove(id);
            if removed.is_some() {
                state.attendance.remove(id);
            }
            Ok(removed)
        })
    }

    fn clear_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError> {
        self.write(|state| {
            let mut cleared = 0;
            for student in state.students.values_mut() {
                if student.class_id.as_ref() == Some(class_id) {
                    student.class_id = None;
                    cleared += 1;
                }
            }
            Ok(cleared)
        })
    }
}

impl ClassRepository for InMemoryStore {
    fn insert(&self, class: Class) -> Result<Class, RepositoryError> {
        self.write(|state| {
            if state.classes.contains_key(&class.id) {
                return Err(RepositoryError::Conflict);
            }
            state.classes.insert(class.id.clone(), class.clone());
            Ok(class)
        })
    }

    fn fetch(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        Ok(self.read()?.classes.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Class>, RepositoryError> {
        Ok(self.read()?.classes.values().cloned().collect())
    }

    fn delete(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        self.write(|state| Ok(state.classes.remove(id)))
    }

    fn add_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError> {
        self.write(|state| {
            let class = state.classes.get_mut(id).ok_or(RepositoryError::NotFound)?;
            if !class.students.contains(student) {
                class.students.push(student.clone());
            }
            Ok(())
        })
    }

    fn remove_member(&self, id: &ClassId, student: &StudentId) -> Result<(), RepositoryError> {
        self.write(|state| {
            let class = state.classes.get_mut(id).ok_or(RepositoryError::NotFound)?;
            class.students.retain(|member| member != student);
            Ok(())
        })
    }
}

impl AttendanceRepository for InMemoryStore {
    fn upsert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        self.write(|state| {
            state
                .attendance
                .entry(record.student.clone())
                .or_default()
                .insert(record.ad_date, record.status);
            Ok(record)
        })
    }

    fn in_range(
        &self,
        students: &[StudentId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.read()?;
        let mut records = Vec::new();
        for student in students {
            let Some(days) = guard.attendance.get(student) else {
                continue;
            };
            for (date, status) in days.range(start..end) {
                records.push(AttendanceRecord {
                    student: student.clone(),
                    ad_date: *date,
                    status: *status,
                });
            }
        }
        Ok(records)
    }
}

/// View of one ledger collection inside an [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    store: InMemoryStore,
    kind: LedgerKind,
}

impl MemoryLedger {
    pub fn kind(&self) -> LedgerKind {
        self.kind
    }
}

impl LedgerRepository for MemoryLedger {
    fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, RepositoryError> {
        let kind = self.kind;
        self.store.write(|state| {
            let ledger = match kind {
                LedgerKind::Payment => &mut state.payments,
                LedgerKind::CustomIncome => &mut state.custom_incomes,
            };
            if ledger.contains_key(&entry.id) {
                return Err(RepositoryError::Conflict);
            }
            ledger.insert(entry.id.clone(), entry.clone());
            Ok(entry)
        })
    }

    fn list(&self, range: &DateRange) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let guard = self.store.read()?;
        let ledger = match self.kind {
            LedgerKind::Payment => &guard.payments,
            LedgerKind::CustomIncome => &guard.custom_incomes,
        };
        let mut entries: Vec<LedgerEntry> = ledger
            .values()
            .filter(|entry| range.contains(entry.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }

    fn delete(&self, id: &EntryId) -> Result<bool, RepositoryError> {
        let kind = self.kind;
        self.store.write(|state| {
            let ledger = match kind {
                LedgerKind::Payment => &mut state.payments,
                LedgerKind::CustomIncome => &mut state.custom_incomes,
            };
            Ok(ledger.remove(id).is_some())
        })
    }
}
