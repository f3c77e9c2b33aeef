//! Entry repository contract.
//!
//! # Responsibility
//! - Define the storage-agnostic seam the calendar service depends on.
//! - Provide the scan-and-filter occurrence lookups backends may reuse.
//!
//! # Invariants
//! - Missing ids are reported as `None`/`false`, never as errors.
//! - Mutations are staged until `save_changes`; reads observe staged state.
//! - `save_changes` is all-or-nothing and surfaces failures to the caller.
//! - Range results omit dates without occurrences.

use crate::db::DbError;
use crate::model::entry::{Entry, EntryId, EntryValidationError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Occurrences keyed by date, ascending. Dates without entries are absent.
pub type EntriesByDate = BTreeMap<NaiveDate, Vec<Entry>>;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    /// `add` was called with an id that is already stored or staged.
    DuplicateId(EntryId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// The repository was closed and holds no storage handle anymore.
    Closed,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "entry already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::Closed => write!(f, "repository is closed"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for calendar entries.
///
/// Callers must not depend on the order of `get_all` or of the per-date
/// lists returned by the occurrence lookups.
pub trait EntryRepository {
    /// Stages a new entry. Rejects ids already present with `DuplicateId`.
    fn add(&mut self, entry: &Entry) -> RepoResult<()>;

    fn get_by_id(&self, id: EntryId) -> RepoResult<Option<Entry>>;

    fn get_all(&self) -> RepoResult<Vec<Entry>>;

    /// Replaces every field of the entry matching `entry.id`.
    ///
    /// Returns `false` (and changes nothing) when no entry matches.
    fn update(&mut self, entry: &Entry) -> RepoResult<bool>;

    /// Returns `false` when no entry matches `id`.
    fn remove(&mut self, id: EntryId) -> RepoResult<bool>;

    /// Entries whose `occurs_on(date)` holds.
    fn get_entries_for_date(&self, date: NaiveDate) -> RepoResult<Vec<Entry>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|entry| entry.occurs_on(date))
            .collect())
    }

    /// Occurrences for every date in `start..=end`.
    fn get_entries_for_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<EntriesByDate> {
        if start > end {
            return Ok(EntriesByDate::new());
        }
        Ok(group_by_date(&self.get_all()?, start, end))
    }

    /// Commits staged mutations atomically.
    fn save_changes(&mut self) -> RepoResult<()>;

    /// Drops staged mutations, restoring the last committed state.
    fn discard_changes(&mut self) -> RepoResult<()>;

    /// Releases held resources and loses unsaved mutations. Safe to repeat.
    fn close(&mut self) -> RepoResult<()>;
}

/// Groups `entries` by each date in `start..=end` on which they occur.
///
/// Returns an empty map when `start > end`.
pub fn group_by_date(entries: &[Entry], start: NaiveDate, end: NaiveDate) -> EntriesByDate {
    let mut grouped = EntriesByDate::new();
    for date in start.iter_days().take_while(|date| *date <= end) {
        let occurring: Vec<Entry> = entries
            .iter()
            .filter(|entry| entry.occurs_on(date))
            .cloned()
            .collect();
        if !occurring.is_empty() {
            grouped.insert(date, occurring);
        }
    }
    grouped
}
