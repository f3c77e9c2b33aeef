//! SQLite-backed entry repository.
//!
//! # Responsibility
//! - Persist entries in the single `entries` table (one row per entry, the
//!   variant recorded in `entry_type`).
//! - Stage mutations in an explicit transaction committed by `save_changes`.
//! - Narrow occurrence lookups in SQL before applying the recurrence rules.
//!
//! # Invariants
//! - The first mutation after a commit opens `BEGIN IMMEDIATE`; reads on the
//!   same connection observe staged rows.
//! - A mutation that stages nothing (missing id, duplicate id) does not leave
//!   a transaction of its own open.
//! - A failed commit is rolled back before the error is returned.
//! - Read paths reject malformed persisted rows instead of masking them.
//! - Timed rows carry both `start_time` and `end_time`; full-day rows carry
//!   neither.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::entry::{
    Entry, EntryId, EntryKind, Recurrence, MAX_ENTRY_YEAR, MIN_ENTRY_YEAR,
};
use crate::repo::entry_repo::{
    group_by_date, EntriesByDate, EntryRepository, RepoError, RepoResult,
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use log::{debug, error, warn};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

const ENTRIES_TABLE: &str = "entries";
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "entry_type",
    "title",
    "description",
    "entry_date",
    "recurrence",
    "start_time",
    "end_time",
];

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    entry_type,
    title,
    description,
    entry_date,
    recurrence,
    start_time,
    end_time
FROM entries";

const LOWEST_DATE_BOUND: &str = "0001-01-01";
const HIGHEST_DATE_BOUND: &str = "9999-12-31";

/// SQLite repository owning its connection until `close`.
pub struct SqliteEntryRepository {
    conn: Option<Connection>,
}

impl SqliteEntryRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for foreign schemas.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Opens (creating if needed) and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Whether mutations are staged and not yet committed.
    pub fn has_pending_changes(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> RepoResult<&Connection> {
        self.conn.as_ref().ok_or(RepoError::Closed)
    }

    /// Returns the connection inside a write transaction, and whether this
    /// call opened it.
    fn staging_conn(&self) -> RepoResult<(&Connection, bool)> {
        let conn = self.conn()?;
        let began = conn.is_autocommit();
        if began {
            conn.execute_batch("BEGIN IMMEDIATE;")?;
        }
        Ok((conn, began))
    }

    /// Rows that can possibly occur in `start..=end`: anchored no later
    /// than `end`, and either recurring or anchored inside the range.
    fn occurrence_candidates(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Entry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE entry_date <= ?2
               AND (recurrence <> 'none' OR entry_date >= ?1)
             ORDER BY entry_date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![date_bound(start), date_bound(end)])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }
}

impl EntryRepository for SqliteEntryRepository {
    fn add(&mut self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;
        let (conn, began) = self.staging_conn()?;

        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1);",
            [entry.id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            release_unused_transaction(conn, began)?;
            return Err(RepoError::DuplicateId(entry.id));
        }

        let (start_time, end_time) = time_columns(&entry.kind);
        conn.execute(
            "INSERT INTO entries (
                id,
                entry_type,
                title,
                description,
                entry_date,
                recurrence,
                start_time,
                end_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.id.to_string(),
                entry_type_to_db(&entry.kind),
                entry.title.as_str(),
                entry.description.as_str(),
                entry.entry_date.to_string(),
                entry.recurrence.as_str(),
                start_time,
                end_time,
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }

    fn get_all(&self) -> RepoResult<Vec<Entry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY entry_date ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn update(&mut self, entry: &Entry) -> RepoResult<bool> {
        entry.validate()?;
        let (conn, began) = self.staging_conn()?;

        let (start_time, end_time) = time_columns(&entry.kind);
        let changed = conn.execute(
            "UPDATE entries
             SET
                entry_type = ?1,
                title = ?2,
                description = ?3,
                entry_date = ?4,
                recurrence = ?5,
                start_time = ?6,
                end_time = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?8;",
            params![
                entry_type_to_db(&entry.kind),
                entry.title.as_str(),
                entry.description.as_str(),
                entry.entry_date.to_string(),
                entry.recurrence.as_str(),
                start_time,
                end_time,
                entry.id.to_string(),
            ],
        )?;

        if changed == 0 {
            release_unused_transaction(conn, began)?;
        }
        Ok(changed > 0)
    }

    fn remove(&mut self, id: EntryId) -> RepoResult<bool> {
        let (conn, began) = self.staging_conn()?;
        let changed = conn.execute("DELETE FROM entries WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            release_unused_transaction(conn, began)?;
        }
        Ok(changed > 0)
    }

    fn get_entries_for_date(&self, date: NaiveDate) -> RepoResult<Vec<Entry>> {
        Ok(self
            .occurrence_candidates(date, date)?
            .into_iter()
            .filter(|entry| entry.occurs_on(date))
            .collect())
    }

    fn get_entries_for_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<EntriesByDate> {
        if start > end {
            return Ok(EntriesByDate::new());
        }
        let candidates = self.occurrence_candidates(start, end)?;
        Ok(group_by_date(&candidates, start, end))
    }

    fn save_changes(&mut self) -> RepoResult<()> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }

        if let Err(err) = conn.execute_batch("COMMIT;") {
            error!("event=repo_commit module=repo status=error error={err}");
            if !conn.is_autocommit() {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                    error!(
                        "event=repo_rollback module=repo status=error error={rollback_err}"
                    );
                }
            }
            return Err(err.into());
        }

        debug!("event=repo_commit module=repo status=ok");
        Ok(())
    }

    fn discard_changes(&mut self) -> RepoResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK;")?;
            debug!("event=repo_rollback module=repo status=ok");
        }
        Ok(())
    }

    fn close(&mut self) -> RepoResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        if !conn.is_autocommit() {
            warn!("event=repo_close module=repo status=discarding_staged_changes");
            if let Err(err) = conn.execute_batch("ROLLBACK;") {
                error!("event=repo_rollback module=repo status=error error={err}");
            }
        }

        conn.close().map_err(|(_, err)| RepoError::from(err))
    }
}

/// Ends a transaction opened by a mutation that staged nothing, so a
/// no-op call leaves no write lock behind. Earlier staged work is kept.
fn release_unused_transaction(conn: &Connection, began: bool) -> RepoResult<()> {
    if began && !conn.is_autocommit() {
        conn.execute_batch("ROLLBACK;")?;
    }
    Ok(())
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [ENTRIES_TABLE],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable(ENTRIES_TABLE));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(entries);")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<HashSet<String>, _>>()?;
    if let Some(&column) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !columns.contains(**column))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: ENTRIES_TABLE,
            column,
        });
    }

    Ok(())
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in entries.id"))
    })?;

    let date_text: String = row.get("entry_date")?;
    let entry_date = date_text.parse::<NaiveDate>().map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{date_text}` in entries.entry_date"))
    })?;

    let recurrence_text: String = row.get("recurrence")?;
    let recurrence = recurrence_text.parse::<Recurrence>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid recurrence `{recurrence_text}` in entries.recurrence"
        ))
    })?;

    let type_text: String = row.get("entry_type")?;
    let start_time = parse_time_column(row, "start_time")?;
    let end_time = parse_time_column(row, "end_time")?;
    let kind = match (type_text.as_str(), start_time, end_time) {
        ("full_day", None, None) => EntryKind::FullDay,
        ("timed", Some(start_time), Some(end_time)) => EntryKind::Timed {
            start_time,
            end_time,
        },
        ("full_day" | "timed", _, _) => {
            return Err(RepoError::InvalidData(format!(
                "entry `{id_text}` of type `{type_text}` has inconsistent time columns"
            )));
        }
        _ => {
            return Err(RepoError::InvalidData(format!(
                "invalid entry type `{type_text}` in entries.entry_type"
            )));
        }
    };

    let entry = Entry {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        entry_date,
        recurrence,
        kind,
    };
    entry.validate()?;
    Ok(entry)
}

fn parse_time_column(row: &Row<'_>, column: &'static str) -> RepoResult<Option<NaiveTime>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => value.parse::<NaiveTime>().map(Some).map_err(|_| {
            RepoError::InvalidData(format!("invalid time `{value}` in entries.{column}"))
        }),
        None => Ok(None),
    }
}

fn entry_type_to_db(kind: &EntryKind) -> &'static str {
    match kind {
        EntryKind::FullDay => "full_day",
        EntryKind::Timed { .. } => "timed",
    }
}

fn time_columns(kind: &EntryKind) -> (Option<String>, Option<String>) {
    match kind {
        EntryKind::FullDay => (None, None),
        EntryKind::Timed {
            start_time,
            end_time,
        } => (Some(start_time.to_string()), Some(end_time.to_string())),
    }
}

/// Text bound for `entry_date` comparisons. Stored dates always fall in
/// years 1..=9999, where the `YYYY-MM-DD` text order matches date order.
fn date_bound(date: NaiveDate) -> String {
    if date.year() < MIN_ENTRY_YEAR {
        LOWEST_DATE_BOUND.to_string()
    } else if date.year() > MAX_ENTRY_YEAR {
        HIGHEST_DATE_BOUND.to_string()
    } else {
        date.to_string()
    }
}
