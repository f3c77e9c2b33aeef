//! Core domain logic for the Sablenda calendar.
//! This crate is the single source of truth for occurrence rules and the
//! date-range query API consumed by UI layers.

pub mod db;
pub mod grid;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;
pub mod storage;

pub use grid::{month_days, month_weeks, MonthGridError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::entry::{
    format_wall_time, parse_wall_time, Entry, EntryId, EntryKind, EntryValidationError,
    Recurrence,
};
pub use repo::entry_repo::{EntriesByDate, EntryRepository, RepoError, RepoResult};
pub use repo::memory_repo::MemoryEntryRepository;
pub use repo::sqlite_repo::SqliteEntryRepository;
pub use service::calendar_service::CalendarService;
pub use settings::{Language, Settings, SettingsError};
pub use storage::{JsonFileStorage, StorageError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
