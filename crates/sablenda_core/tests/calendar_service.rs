use chrono::{NaiveDate, NaiveTime};
use sablenda_core::db::DbError;
use sablenda_core::{
    CalendarService, EntriesByDate, Entry, EntryId, EntryRepository, MemoryEntryRepository,
    MonthGridError, Recurrence, RepoError, RepoResult, SqliteEntryRepository,
};
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

/// Memory repository that counts range lookups and can refuse commits.
#[derive(Default)]
struct CountingRepository {
    inner: MemoryEntryRepository,
    range_calls: Rc<Cell<usize>>,
    fail_commit: Rc<Cell<bool>>,
}

impl EntryRepository for CountingRepository {
    fn add(&mut self, entry: &Entry) -> RepoResult<()> {
        self.inner.add(entry)
    }

    fn get_by_id(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        self.inner.get_by_id(id)
    }

    fn get_all(&self) -> RepoResult<Vec<Entry>> {
        self.inner.get_all()
    }

    fn update(&mut self, entry: &Entry) -> RepoResult<bool> {
        self.inner.update(entry)
    }

    fn remove(&mut self, id: EntryId) -> RepoResult<bool> {
        self.inner.remove(id)
    }

    fn get_entries_for_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<EntriesByDate> {
        self.range_calls.set(self.range_calls.get() + 1);
        self.inner.get_entries_for_date_range(start, end)
    }

    fn save_changes(&mut self) -> RepoResult<()> {
        if self.fail_commit.get() {
            return Err(RepoError::Db(DbError::Io {
                path: "calendar.db".into(),
                source: std::io::Error::other("disk full"),
            }));
        }
        self.inner.save_changes()
    }

    fn discard_changes(&mut self) -> RepoResult<()> {
        self.inner.discard_changes()
    }

    fn close(&mut self) -> RepoResult<()> {
        self.inner.close()
    }
}

fn counting_service() -> (CalendarService<CountingRepository>, Rc<Cell<usize>>, Rc<Cell<bool>>) {
    let repo = CountingRepository::default();
    let range_calls = Rc::clone(&repo.range_calls);
    let fail_commit = Rc::clone(&repo.fail_commit);
    (CalendarService::new(repo), range_calls, fail_commit)
}

#[test]
fn add_then_get_roundtrip_in_every_mode() {
    let entry = Entry::timed("Dentist", day(2025, 3, 4), time(14, 0), time(15, 0))
        .with_description("bring card")
        .with_recurrence(Recurrence::Yearly);

    let mut detached = CalendarService::detached();
    detached.add_entry(entry.clone()).unwrap();
    assert_eq!(detached.get_entry(entry.id).unwrap(), Some(entry.clone()));

    let mut sqlite = CalendarService::new(SqliteEntryRepository::open_in_memory().unwrap());
    sqlite.add_entry(entry.clone()).unwrap();
    assert_eq!(sqlite.get_entry(entry.id).unwrap(), Some(entry.clone()));
    assert!(!sqlite.repository().unwrap().has_pending_changes());
}

#[test]
fn weekly_entry_scenario_by_date() {
    let mut calendar = CalendarService::new(SqliteEntryRepository::open_in_memory().unwrap());
    calendar
        .add_entry(Entry::full_day("Weekly Meeting", day(2025, 5, 15)).with_recurrence(Recurrence::Weekly))
        .unwrap();

    assert_eq!(calendar.get_entries_for_date(day(2025, 5, 15)).unwrap().len(), 1);
    assert_eq!(calendar.get_entries_for_date(day(2025, 5, 22)).unwrap().len(), 1);
    assert_eq!(calendar.get_entries_for_date(day(2025, 5, 16)).unwrap().len(), 0);
}

#[test]
fn derived_date_queries_match_entry_list() {
    let mut calendar = CalendarService::detached();
    calendar.add_entry(Entry::full_day("a", day(2025, 1, 10))).unwrap();
    calendar
        .add_entry(Entry::full_day("b", day(2025, 1, 1)).with_recurrence(Recurrence::Daily))
        .unwrap();

    assert_eq!(calendar.get_entry_count_for_date(day(2025, 1, 10)).unwrap(), 2);
    assert_eq!(calendar.get_entry_count_for_date(day(2025, 1, 11)).unwrap(), 1);
    assert!(calendar.has_entries_on_date(day(2025, 1, 11)).unwrap());
    assert!(!calendar.has_entries_on_date(day(2024, 12, 31)).unwrap());
}

#[test]
fn repeated_range_query_is_served_from_cache() {
    let (mut calendar, range_calls, _) = counting_service();
    calendar
        .add_entry(Entry::full_day("gym", day(2025, 5, 1)).with_recurrence(Recurrence::Weekly))
        .unwrap();

    let first = calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();
    let second = calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    assert_eq!(range_calls.get(), 1);
    assert_eq!(calendar.cached_range(), Some((day(2025, 5, 1), day(2025, 5, 31))));
}

#[test]
fn alternating_ranges_miss_every_time() {
    let (mut calendar, range_calls, _) = counting_service();
    let may = (day(2025, 5, 1), day(2025, 5, 31));
    let june = (day(2025, 6, 1), day(2025, 6, 30));

    calendar.get_entries_for_date_range(may.0, may.1).unwrap();
    calendar.get_entries_for_date_range(june.0, june.1).unwrap();
    calendar.get_entries_for_date_range(may.0, may.1).unwrap();

    assert_eq!(range_calls.get(), 3);
    assert_eq!(calendar.cached_range(), Some(may));
}

#[test]
fn narrower_range_inside_cached_range_is_a_miss() {
    let (mut calendar, range_calls, _) = counting_service();
    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();
    calendar
        .get_entries_for_date_range(day(2025, 5, 2), day(2025, 5, 30))
        .unwrap();
    assert_eq!(range_calls.get(), 2);
}

#[test]
fn mutations_between_range_queries_are_reflected() {
    let (mut calendar, range_calls, _) = counting_service();
    let entry = Entry::full_day("party", day(2025, 5, 10));
    calendar.add_entry(entry.clone()).unwrap();
    let range = (day(2025, 5, 1), day(2025, 5, 31));

    let before = calendar.get_entries_for_date_range(range.0, range.1).unwrap();
    assert_eq!(before[&day(2025, 5, 10)], vec![entry.clone()]);

    assert!(calendar.remove_entry(entry.id).unwrap());
    assert_eq!(calendar.cached_range(), None);
    let after_remove = calendar.get_entries_for_date_range(range.0, range.1).unwrap();
    assert!(after_remove.is_empty());

    let mut moved = entry.clone();
    moved.entry_date = day(2025, 5, 20);
    calendar.add_entry(moved.clone()).unwrap();
    let after_add = calendar.get_entries_for_date_range(range.0, range.1).unwrap();
    assert_eq!(after_add.keys().copied().collect::<Vec<_>>(), vec![day(2025, 5, 20)]);

    assert_eq!(range_calls.get(), 3);
}

#[test]
fn update_of_existing_entry_invalidates_cache() {
    let (mut calendar, range_calls, _) = counting_service();
    let mut entry = Entry::full_day("review", day(2025, 5, 10));
    calendar.add_entry(entry.clone()).unwrap();
    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();

    entry.title = "quarterly review".to_string();
    assert!(calendar.update_entry(entry.clone()).unwrap());
    assert_eq!(calendar.cached_range(), None);

    let range = calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();
    assert_eq!(range[&day(2025, 5, 10)][0].title, "quarterly review");
    assert_eq!(range_calls.get(), 2);
}

#[test]
fn missing_id_mutations_leave_cache_intact() {
    let (mut calendar, range_calls, _) = counting_service();
    calendar.add_entry(Entry::full_day("x", day(2025, 5, 10))).unwrap();
    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();

    assert!(!calendar.remove_entry(Uuid::new_v4()).unwrap());
    assert!(!calendar
        .update_entry(Entry::full_day("ghost", day(2025, 5, 11)))
        .unwrap());
    assert_eq!(calendar.cached_range(), Some((day(2025, 5, 1), day(2025, 5, 31))));

    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();
    assert_eq!(range_calls.get(), 1);
}

#[test]
fn add_invalidates_cache_even_when_rejected() {
    let (mut calendar, _, _) = counting_service();
    let entry = Entry::full_day("x", day(2025, 5, 10));
    calendar.add_entry(entry.clone()).unwrap();
    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();

    let err = calendar.add_entry(entry.clone()).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId(id) if id == entry.id));
    assert_eq!(calendar.cached_range(), None);
}

#[test]
fn single_date_queries_do_not_touch_cache() {
    let (mut calendar, range_calls, _) = counting_service();
    calendar.add_entry(Entry::full_day("x", day(2025, 5, 10))).unwrap();
    calendar
        .get_entries_for_date_range(day(2025, 5, 1), day(2025, 5, 31))
        .unwrap();

    calendar.get_entries_for_date(day(2025, 7, 1)).unwrap();
    calendar.get_entry_count_for_date(day(2025, 5, 10)).unwrap();

    assert_eq!(calendar.cached_range(), Some((day(2025, 5, 1), day(2025, 5, 31))));
    assert_eq!(range_calls.get(), 1);
}

#[test]
fn reversed_range_returns_empty_without_storage_access() {
    let (mut calendar, range_calls, _) = counting_service();
    calendar
        .add_entry(Entry::full_day("daily", day(2025, 1, 1)).with_recurrence(Recurrence::Daily))
        .unwrap();

    let result = calendar
        .get_entries_for_date_range(day(2025, 2, 1), day(2025, 1, 1))
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(range_calls.get(), 0);

    let mut detached = CalendarService::detached();
    detached
        .add_entry(Entry::full_day("daily", day(2025, 1, 1)).with_recurrence(Recurrence::Daily))
        .unwrap();
    assert!(detached
        .get_entries_for_date_range(day(2025, 2, 1), day(2025, 1, 1))
        .unwrap()
        .is_empty());
}

#[test]
fn commit_failure_propagates_and_discards_staged_entry() {
    let (mut calendar, _, fail_commit) = counting_service();
    fail_commit.set(true);

    let entry = Entry::full_day("lost", day(2025, 5, 10));
    let err = calendar.add_entry(entry.clone()).unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Io { .. })));
    assert_eq!(calendar.get_entry(entry.id).unwrap(), None);

    fail_commit.set(false);
    calendar.add_entry(entry.clone()).unwrap();
    assert_eq!(calendar.get_entry(entry.id).unwrap(), Some(entry));
}

#[test]
fn commit_failure_on_remove_keeps_entry() {
    let (mut calendar, _, fail_commit) = counting_service();
    let entry = Entry::full_day("keep", day(2025, 5, 10));
    calendar.add_entry(entry.clone()).unwrap();

    fail_commit.set(true);
    assert!(calendar.remove_entry(entry.id).is_err());
    fail_commit.set(false);

    assert_eq!(calendar.get_entry(entry.id).unwrap(), Some(entry));
}

#[test]
fn import_is_all_or_nothing() {
    let mut calendar = CalendarService::new(MemoryEntryRepository::new());
    let first = Entry::full_day("one", day(2025, 1, 1));
    let mut clash = Entry::full_day("two", day(2025, 1, 2));
    clash.id = first.id;

    assert!(matches!(
        calendar.import_entries(vec![first.clone(), clash.clone()]),
        Err(RepoError::DuplicateId(_))
    ));
    assert!(calendar.all_entries().unwrap().is_empty());

    let mut detached = CalendarService::detached();
    assert!(detached.import_entries(vec![first.clone(), clash]).is_err());
    assert!(detached.all_entries().unwrap().is_empty());

    let second = Entry::full_day("two", day(2025, 1, 2));
    assert_eq!(calendar.import_entries(vec![first, second]).unwrap(), 2);
    assert_eq!(calendar.all_entries().unwrap().len(), 2);
    assert!(!calendar.repository().unwrap().has_pending_changes());
}

#[test]
fn detached_update_and_remove() {
    let mut calendar = CalendarService::detached();
    let mut entry = Entry::full_day("draft", day(2025, 8, 1));
    calendar.add_entry(entry.clone()).unwrap();

    entry.recurrence = Recurrence::Monthly;
    assert!(calendar.update_entry(entry.clone()).unwrap());
    assert_eq!(calendar.get_entry_count_for_date(day(2025, 9, 1)).unwrap(), 1);

    assert!(calendar.remove_entry(entry.id).unwrap());
    assert!(!calendar.remove_entry(entry.id).unwrap());
    assert!(!calendar.update_entry(entry).unwrap());
}

#[test]
fn month_days_are_exposed_through_service() {
    let calendar = CalendarService::detached();
    let days = calendar.get_month_days(2025, 2).unwrap();
    assert_eq!(days.len(), 35);
    assert_eq!(days[0], day(2025, 1, 27));
    assert_eq!(days[34], day(2025, 3, 2));

    assert_eq!(
        calendar.get_month_days(2025, 0),
        Err(MonthGridError::InvalidMonth { year: 2025, month: 0 })
    );
}

#[test]
fn service_over_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sablenda.db");
    let entry = Entry::full_day("persisted", day(2025, 12, 24)).with_recurrence(Recurrence::Yearly);

    let mut calendar = CalendarService::new(SqliteEntryRepository::open(&path).unwrap());
    calendar.add_entry(entry.clone()).unwrap();
    let mut repo = calendar.into_repository().unwrap();
    repo.close().unwrap();

    let mut reopened = CalendarService::new(SqliteEntryRepository::open(&path).unwrap());
    let range = reopened
        .get_entries_for_date_range(day(2026, 12, 1), day(2026, 12, 31))
        .unwrap();
    assert_eq!(range[&day(2026, 12, 24)], vec![entry]);
}

#[test]
fn unmatched_remove_does_not_block_other_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sablenda.db");

    let mut first = CalendarService::new(SqliteEntryRepository::open(&path).unwrap());
    assert!(!first.remove_entry(Uuid::new_v4()).unwrap());
    assert!(!first.update_entry(Entry::full_day("ghost", day(2025, 1, 1))).unwrap());
    assert!(!first.repository().unwrap().has_pending_changes());

    let mut second = CalendarService::new(SqliteEntryRepository::open(&path).unwrap());
    let entry = Entry::full_day("shared", day(2025, 1, 2));
    second.add_entry(entry.clone()).unwrap();
    assert_eq!(first.get_entry(entry.id).unwrap(), Some(entry));
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}
