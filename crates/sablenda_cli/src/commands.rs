use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate, NaiveTime};
use sablenda_core::{
    month_weeks, CalendarService, Entry, EntryId, EntryRepository, JsonFileStorage, Recurrence,
};
use std::path::PathBuf;

pub struct NewEntry {
    pub title: String,
    pub date: NaiveDate,
    pub times: Option<(NaiveTime, NaiveTime)>,
    pub recurrence: Recurrence,
    pub description: String,
}

pub fn add<R: EntryRepository>(calendar: &mut CalendarService<R>, new: NewEntry) -> Result<()> {
    let entry = match new.times {
        Some((start, end)) => Entry::timed(new.title, new.date, start, end),
        None => Entry::full_day(new.title, new.date),
    }
    .with_description(new.description)
    .with_recurrence(new.recurrence);

    let id = entry.id;
    calendar.add_entry(entry)?;
    println!("added {id}");
    Ok(())
}

pub fn day<R: EntryRepository>(calendar: &CalendarService<R>, date: NaiveDate) -> Result<()> {
    let mut entries = calendar.get_entries_for_date(date)?;
    entries.sort_by_key(|entry| entry.start_time());

    println!("{}", date.format("%A %Y-%m-%d"));
    if entries.is_empty() {
        println!("  (no entries)");
    }
    for entry in entries {
        println!("  {}  [{}]  {}", entry.id, entry.recurrence, entry.display_text());
    }
    Ok(())
}

/// Prints Monday-first weeks; days outside the month are bracketed and
/// days with entries carry their count.
pub fn month<R: EntryRepository>(
    calendar: &mut CalendarService<R>,
    year: i32,
    month: u32,
) -> Result<()> {
    let weeks = month_weeks(year, month)?;
    let (Some(first), Some(last)) = (
        weeks.first().and_then(|week| week.first()).copied(),
        weeks.last().and_then(|week| week.last()).copied(),
    ) else {
        bail!("empty grid for {year}-{month:02}");
    };
    let entries = calendar.get_entries_for_date_range(first, last)?;

    println!("{year}-{month:02}");
    println!("   Mon    Tue    Wed    Thu    Fri    Sat    Sun");
    for week in weeks {
        let cells: Vec<String> = week
            .iter()
            .map(|date| {
                let count = entries.get(date).map_or(0, Vec::len);
                let day = if date.month() == month {
                    format!(" {:>2} ", date.day())
                } else {
                    format!("[{:>2}]", date.day())
                };
                if count > 0 {
                    format!("{day}{count:<2}")
                } else {
                    format!("{day}  ")
                }
            })
            .collect();
        println!(" {}", cells.join(" "));
    }
    Ok(())
}

pub fn remove<R: EntryRepository>(calendar: &mut CalendarService<R>, id: EntryId) -> Result<()> {
    if !calendar.remove_entry(id)? {
        bail!("no entry with id {id}");
    }
    println!("removed {id}");
    Ok(())
}

pub fn export<R: EntryRepository>(calendar: &CalendarService<R>, path: PathBuf) -> Result<()> {
    let entries = calendar.all_entries()?;
    JsonFileStorage::new(path.clone()).save(&entries)?;
    println!("exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

pub fn import<R: EntryRepository>(calendar: &mut CalendarService<R>, path: PathBuf) -> Result<()> {
    let entries = JsonFileStorage::new(path.clone()).load()?;
    let count = calendar.import_entries(entries)?;
    println!("imported {count} entries from {}", path.display());
    Ok(())
}
