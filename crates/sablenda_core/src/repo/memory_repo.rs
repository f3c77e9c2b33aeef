//! In-memory entry repository.
//!
//! Keeps a committed snapshot next to a working copy so staging, commit and
//! discard behave like the SQLite backend without any I/O.

use crate::model::entry::{Entry, EntryId};
use crate::repo::entry_repo::{EntryRepository, RepoError, RepoResult};

/// Vec-backed repository for tests and ephemeral calendars.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryRepository {
    committed: Vec<Entry>,
    working: Vec<Entry>,
}

impl MemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository whose committed state is `entries`.
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            committed: entries.clone(),
            working: entries,
        }
    }

    /// Whether staged mutations differ from the committed snapshot.
    pub fn has_pending_changes(&self) -> bool {
        self.working != self.committed
    }

    /// Committed entries only, ignoring staged mutations.
    pub fn committed(&self) -> &[Entry] {
        &self.committed
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.working.iter().position(|entry| entry.id == id)
    }
}

impl EntryRepository for MemoryEntryRepository {
    fn add(&mut self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;
        if self.position(entry.id).is_some() {
            return Err(RepoError::DuplicateId(entry.id));
        }
        self.working.push(entry.clone());
        Ok(())
    }

    fn get_by_id(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        Ok(self.position(id).map(|index| self.working[index].clone()))
    }

    fn get_all(&self) -> RepoResult<Vec<Entry>> {
        Ok(self.working.clone())
    }

    fn update(&mut self, entry: &Entry) -> RepoResult<bool> {
        entry.validate()?;
        match self.position(entry.id) {
            Some(index) => {
                self.working[index] = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&mut self, id: EntryId) -> RepoResult<bool> {
        match self.position(id) {
            Some(index) => {
                self.working.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn save_changes(&mut self) -> RepoResult<()> {
        self.committed.clone_from(&self.working);
        Ok(())
    }

    fn discard_changes(&mut self) -> RepoResult<()> {
        self.working.clone_from(&self.committed);
        Ok(())
    }

    fn close(&mut self) -> RepoResult<()> {
        self.discard_changes()
    }
}
