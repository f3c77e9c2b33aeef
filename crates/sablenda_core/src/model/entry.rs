//! Entry domain model.
//!
//! # Responsibility
//! - Define the calendar item record (full-day or timed) and its recurrence.
//! - Provide the occurrence predicate used by every query path.
//! - Provide display helpers consumed by month/day views.
//!
//! # Invariants
//! - `id` is stable across updates and never reused for another entry.
//! - An entry always occurs on its anchor date, whatever its recurrence.
//! - No occurrence exists before the anchor date.
//! - Monthly recurrence matches day-of-month only; an anchor on the 31st
//!   never occurs in shorter months.

use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for calendar entries.
pub type EntryId = Uuid;

/// Text shown for entries with an empty title.
pub const UNTITLED_PLACEHOLDER: &str = "Untitled";

/// Earliest and latest years a persisted entry may be anchored in.
pub const MIN_ENTRY_YEAR: i32 = 1;
pub const MAX_ENTRY_YEAR: i32 = 9999;

/// Recurrence rule applied forward from the anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Occurs on the anchor date only.
    #[default]
    None,
    /// Every day from the anchor date on.
    Daily,
    /// Every seventh day from the anchor date on.
    Weekly,
    /// Same day-of-month, no rollover into short months.
    Monthly,
    /// Same month and day-of-month.
    Yearly,
}

impl Recurrence {
    /// Stable lowercase name used by storage and CLI input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a recurrence name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecurrenceError(pub String);

impl Display for ParseRecurrenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown recurrence `{}`; expected none|daily|weekly|monthly|yearly",
            self.0
        )
    }
}

impl Error for ParseRecurrenceError {}

impl FromStr for Recurrence {
    type Err = ParseRecurrenceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(ParseRecurrenceError(value.to_string())),
        }
    }
}

/// Variant-specific part of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// All-day item (birthday, holiday, reminder).
    FullDay,
    /// Item with wall-clock start and end times, no timezone.
    Timed {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

impl EntryKind {
    /// Timed kind with the 09:00-10:00 window new timed entries start with.
    pub fn timed_default() -> Self {
        Self::Timed {
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Timed { .. })
    }
}

/// Validation failures for entry invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    /// The nil UUID cannot identify an entry.
    NilId,
    /// Anchor year outside the range storage can represent.
    DateOutOfRange(NaiveDate),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "entry id must not be the nil uuid"),
            Self::DateOutOfRange(date) => write!(
                f,
                "entry date {date} is outside years {MIN_ENTRY_YEAR}..={MAX_ENTRY_YEAR}"
            ),
        }
    }
}

impl Error for EntryValidationError {}

/// A user-created calendar item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Sole identity key for lookup, update and removal.
    pub id: EntryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Anchor date: first occurrence, recurrence computes forward from here.
    pub entry_date: NaiveDate,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub kind: EntryKind,
}

impl Default for Entry {
    fn default() -> Self {
        Self::new(EntryKind::FullDay, "", Local::now().date_naive())
    }
}

impl Entry {
    /// Creates a non-recurring entry with a freshly generated id.
    pub fn new(kind: EntryKind, title: impl Into<String>, entry_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            entry_date,
            recurrence: Recurrence::None,
            kind,
        }
    }

    /// Creates an entry with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    ///
    /// # Errors
    /// - `NilId` when `id` is the nil UUID.
    pub fn with_id(
        id: EntryId,
        kind: EntryKind,
        title: impl Into<String>,
        entry_date: NaiveDate,
    ) -> Result<Self, EntryValidationError> {
        let mut entry = Self::new(kind, title, entry_date);
        entry.id = id;
        entry.validate()?;
        Ok(entry)
    }

    pub fn full_day(title: impl Into<String>, entry_date: NaiveDate) -> Self {
        Self::new(EntryKind::FullDay, title, entry_date)
    }

    pub fn timed(
        title: impl Into<String>,
        entry_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self::new(
            EntryKind::Timed {
                start_time,
                end_time,
            },
            title,
            entry_date,
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        match self.kind {
            EntryKind::Timed { start_time, .. } => Some(start_time),
            EntryKind::FullDay => None,
        }
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        match self.kind {
            EntryKind::Timed { end_time, .. } => Some(end_time),
            EntryKind::FullDay => None,
        }
    }

    /// Title, or the placeholder when the title is empty.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_PLACEHOLDER
        } else {
            self.title.as_str()
        }
    }

    /// Text rendered in day lists; timed entries are prefixed `HH:MM-HH:MM `.
    pub fn display_text(&self) -> String {
        match self.kind {
            EntryKind::FullDay => self.display_title().to_string(),
            EntryKind::Timed {
                start_time,
                end_time,
            } => format!(
                "{}-{} {}",
                format_wall_time(start_time),
                format_wall_time(end_time),
                self.display_title()
            ),
        }
    }

    /// Returns whether this entry occurs on `date`.
    ///
    /// Total over all dates: never panics and has no side effects.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        let anchor = self.entry_date;
        if date == anchor {
            return true;
        }
        if date < anchor {
            return false;
        }

        match self.recurrence {
            Recurrence::None => false,
            Recurrence::Daily => true,
            Recurrence::Weekly => (date - anchor).num_days() % 7 == 0,
            Recurrence::Monthly => date.day() == anchor.day(),
            Recurrence::Yearly => date.month() == anchor.month() && date.day() == anchor.day(),
        }
    }

    /// Validates invariants enforced before persistence.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.is_nil() {
            return Err(EntryValidationError::NilId);
        }
        if !(MIN_ENTRY_YEAR..=MAX_ENTRY_YEAR).contains(&self.entry_date.year()) {
            return Err(EntryValidationError::DateOutOfRange(self.entry_date));
        }
        Ok(())
    }
}

/// Formats a wall-clock time as `HH:MM`.
pub fn format_wall_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parses user-typed `H:MM` / `HH:MM` input.
///
/// Returns `None` for anything else, including out-of-range hours/minutes.
pub fn parse_wall_time(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 {
        return None;
    }
    if !all_digits(hours) || !all_digits(minutes) {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}
