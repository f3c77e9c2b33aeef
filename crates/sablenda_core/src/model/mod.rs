//! Calendar domain model.
//!
//! # Responsibility
//! - Define the canonical entry record shared by every storage backend.
//! - Own the recurrence rules that decide on which dates an entry occurs.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - Occurrence is a pure function of the entry and the candidate date.

pub mod entry;
