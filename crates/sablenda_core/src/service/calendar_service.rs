//! Calendar query service.
//!
//! # Responsibility
//! - Single front door for "what occurs when", whether or not a repository
//!   is configured.
//! - Commit every mutation through the repository and surface failures.
//! - Memoize the most recent date-range query in a single cache slot.
//!
//! # Invariants
//! - The range cache holds at most one `(start, end)` result and is only
//!   hit on exact bound equality.
//! - `add_entry` and `import_entries` clear the cache unconditionally;
//!   `update_entry` and `remove_entry` clear it only on a confirmed match.
//! - Single-date queries never read or write the range cache.
//! - Not thread-safe; hosts sharing a service across threads must wrap it.

use crate::grid::{month_days, MonthGridError};
use crate::model::entry::{Entry, EntryId};
use crate::repo::entry_repo::{
    group_by_date, EntriesByDate, EntryRepository, RepoError, RepoResult,
};
use crate::repo::memory_repo::MemoryEntryRepository;
use chrono::NaiveDate;
use log::{debug, error, info};

struct RangeCache {
    start: NaiveDate,
    end: NaiveDate,
    entries: EntriesByDate,
}

/// Calendar use-case service over an optional repository.
pub struct CalendarService<R: EntryRepository> {
    repo: Option<R>,
    detached_entries: Vec<Entry>,
    range_cache: Option<RangeCache>,
}

impl CalendarService<MemoryEntryRepository> {
    /// Creates a service keeping entries in a plain list, with no
    /// repository and no commit step.
    pub fn detached() -> Self {
        Self {
            repo: None,
            detached_entries: Vec::new(),
            range_cache: None,
        }
    }
}

impl<R: EntryRepository> CalendarService<R> {
    /// Creates a service persisting through `repo`.
    pub fn new(repo: R) -> Self {
        Self {
            repo: Some(repo),
            detached_entries: Vec::new(),
            range_cache: None,
        }
    }

    pub fn repository(&self) -> Option<&R> {
        self.repo.as_ref()
    }

    /// Consumes the service, returning its repository (if any).
    pub fn into_repository(self) -> Option<R> {
        self.repo
    }

    /// Bounds of the currently cached range, if any.
    pub fn cached_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.range_cache
            .as_ref()
            .map(|cache| (cache.start, cache.end))
    }

    /// Adds and commits one entry.
    ///
    /// # Errors
    /// - `DuplicateId` when the id already exists.
    /// - `Validation` for invalid entries.
    /// - Storage errors from the repository, after staged changes were
    ///   discarded.
    pub fn add_entry(&mut self, entry: Entry) -> RepoResult<()> {
        self.invalidate_cache();

        match self.repo.as_mut() {
            Some(repo) => {
                let result = repo.add(&entry).and_then(|()| repo.save_changes());
                commit_or_discard(repo, "entry_add", result)?;
            }
            None => {
                entry.validate()?;
                if self.detached_entries.iter().any(|e| e.id == entry.id) {
                    return Err(RepoError::DuplicateId(entry.id));
                }
                self.detached_entries.push(entry);
            }
        }

        info!("event=entry_add module=service status=ok");
        Ok(())
    }

    /// Removes and commits one entry. Returns `false` when `id` is unknown.
    pub fn remove_entry(&mut self, id: EntryId) -> RepoResult<bool> {
        let removed = match self.repo.as_mut() {
            Some(repo) => {
                let result = repo.remove(id).and_then(|removed| {
                    if removed {
                        repo.save_changes()?;
                    }
                    Ok(removed)
                });
                commit_or_discard(repo, "entry_remove", result)?
            }
            None => {
                let before = self.detached_entries.len();
                self.detached_entries.retain(|entry| entry.id != id);
                self.detached_entries.len() != before
            }
        };

        if removed {
            self.invalidate_cache();
        }
        info!("event=entry_remove module=service status=ok found={removed}");
        Ok(removed)
    }

    pub fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        match self.repo.as_ref() {
            Some(repo) => repo.get_by_id(id),
            None => Ok(self
                .detached_entries
                .iter()
                .find(|entry| entry.id == id)
                .cloned()),
        }
    }

    /// Replaces the stored entry with the same id and commits.
    ///
    /// Returns `false` when no entry matches.
    pub fn update_entry(&mut self, entry: Entry) -> RepoResult<bool> {
        let updated = match self.repo.as_mut() {
            Some(repo) => {
                let result = repo.update(&entry).and_then(|updated| {
                    if updated {
                        repo.save_changes()?;
                    }
                    Ok(updated)
                });
                commit_or_discard(repo, "entry_update", result)?
            }
            None => {
                entry.validate()?;
                match self
                    .detached_entries
                    .iter_mut()
                    .find(|existing| existing.id == entry.id)
                {
                    Some(existing) => {
                        *existing = entry;
                        true
                    }
                    None => false,
                }
            }
        };

        if updated {
            self.invalidate_cache();
        }
        info!("event=entry_update module=service status=ok found={updated}");
        Ok(updated)
    }

    /// Every stored entry, in no particular order.
    pub fn all_entries(&self) -> RepoResult<Vec<Entry>> {
        match self.repo.as_ref() {
            Some(repo) => repo.get_all(),
            None => Ok(self.detached_entries.clone()),
        }
    }

    /// Adds a batch of entries with a single commit.
    ///
    /// Either every entry is stored or none is.
    pub fn import_entries(&mut self, entries: Vec<Entry>) -> RepoResult<usize> {
        self.invalidate_cache();
        let count = entries.len();

        match self.repo.as_mut() {
            Some(repo) => {
                let result = entries
                    .iter()
                    .try_for_each(|entry| repo.add(entry))
                    .and_then(|()| repo.save_changes());
                commit_or_discard(repo, "entry_import", result)?;
            }
            None => {
                for (index, entry) in entries.iter().enumerate() {
                    entry.validate()?;
                    let mut seen = self.detached_entries.iter().chain(&entries[..index]);
                    if seen.any(|existing| existing.id == entry.id) {
                        return Err(RepoError::DuplicateId(entry.id));
                    }
                }
                self.detached_entries.extend(entries);
            }
        }

        info!("event=entry_import module=service status=ok count={count}");
        Ok(count)
    }

    /// Entries occurring on `date`. Never cached.
    pub fn get_entries_for_date(&self, date: NaiveDate) -> RepoResult<Vec<Entry>> {
        match self.repo.as_ref() {
            Some(repo) => repo.get_entries_for_date(date),
            None => Ok(self
                .detached_entries
                .iter()
                .filter(|entry| entry.occurs_on(date))
                .cloned()
                .collect()),
        }
    }

    pub fn has_entries_on_date(&self, date: NaiveDate) -> RepoResult<bool> {
        Ok(!self.get_entries_for_date(date)?.is_empty())
    }

    pub fn get_entry_count_for_date(&self, date: NaiveDate) -> RepoResult<usize> {
        Ok(self.get_entries_for_date(date)?.len())
    }

    /// Occurrences in `start..=end`, served from the cache slot on an exact
    /// bounds match. A miss recomputes and overwrites the slot.
    ///
    /// Reversed bounds yield an empty map without touching storage.
    pub fn get_entries_for_date_range(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<EntriesByDate> {
        if let Some(cache) = self.range_cache.as_ref() {
            if cache.start == start && cache.end == end {
                debug!("event=range_query module=service status=cache_hit");
                return Ok(cache.entries.clone());
            }
        }

        let entries = if start > end {
            EntriesByDate::new()
        } else {
            match self.repo.as_ref() {
                Some(repo) => repo.get_entries_for_date_range(start, end)?,
                None => group_by_date(&self.detached_entries, start, end),
            }
        };
        debug!(
            "event=range_query module=service status=cache_miss dates={}",
            entries.len()
        );

        self.range_cache = Some(RangeCache {
            start,
            end,
            entries: entries.clone(),
        });
        Ok(entries)
    }

    /// Dates of the month view for `(year, month)`; see [`month_days`].
    pub fn get_month_days(&self, year: i32, month: u32) -> Result<Vec<NaiveDate>, MonthGridError> {
        month_days(year, month)
    }

    fn invalidate_cache(&mut self) {
        self.range_cache = None;
    }
}

fn commit_or_discard<R: EntryRepository, T>(
    repo: &mut R,
    event: &'static str,
    result: RepoResult<T>,
) -> RepoResult<T> {
    result.inspect_err(|err| {
        error!("event={event} module=service status=error error={err}");
        if let Err(discard_err) = repo.discard_changes() {
            error!("event={event} module=service status=discard_failed error={discard_err}");
        }
    })
}
