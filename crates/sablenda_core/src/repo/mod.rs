//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the entry storage contract the calendar service depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes call `Entry::validate()` before persisting.
//! - Not-found is a value (`None`/`false`); only storage failures are errors.

pub mod entry_repo;
pub mod memory_repo;
pub mod sqlite_repo;
